use mail_parser::{Address as ParsedAddress, MessageParser};

use crate::store::Address;

/// Values taken from the `HEADER.FIELDS` block of a FETCH response.
#[derive(Debug, Default, PartialEq)]
pub struct HeaderFields {
    pub from: Vec<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub reply_to: Vec<Address>,
    pub subject: Option<String>,
    pub message_id: Option<String>,
    pub references: Vec<String>,
}

fn addresses(parsed: Option<&ParsedAddress<'_>>) -> Vec<Address> {
    parsed.map_or_else(Vec::new, |addrs| {
        addrs
            .iter()
            .filter_map(|addr| {
                let address = addr.address()?;
                Some(Address::new(
                    addr.name().map(ToString::to_string),
                    address.to_string(),
                ))
            })
            .collect()
    })
}

pub fn strip_arrows(value: &str) -> &str {
    value
        .strip_prefix('<')
        .and_then(|value| value.strip_suffix('>'))
        .unwrap_or(value)
}

impl HeaderFields {
    /// Missing or unparsable input yields empty fields.
    pub fn parse(raw: Option<&[u8]>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let Some(message) = MessageParser::default().parse(raw) else {
            return Self::default();
        };

        let references = message
            .references()
            .as_text_list()
            .map(|ids| {
                ids.iter()
                    .flat_map(|id| id.split_whitespace())
                    .map(|id| strip_arrows(id).to_string())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            from: addresses(message.from()),
            to: addresses(message.to()),
            cc: addresses(message.cc()),
            bcc: addresses(message.bcc()),
            reply_to: addresses(message.reply_to()),
            subject: message.subject().map(ToString::to_string),
            message_id: message
                .message_id()
                .map(|id| strip_arrows(id).to_string()),
            references,
        }
    }
}

/// Decodes RFC 2047 encoded words, e.g. in a MIME `name` parameter.
pub fn decode_words(value: &str) -> String {
    if !value.contains("=?") {
        return value.to_string();
    }
    let raw = format!("Subject: {value}\r\n\r\n");
    MessageParser::default()
        .parse(raw.as_bytes())
        .and_then(|message| message.subject().map(ToString::to_string))
        .unwrap_or_else(|| value.to_string())
}

/// Decodes an RFC 2231 extended value such as `utf-8'en'na%C3%AFve.txt`.
pub fn decode_rfc2231(value: &str) -> Option<String> {
    let mut fields = value.splitn(3, '\'');
    let (Some(charset), Some(_language), Some(text)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return None;
    };
    if text.is_empty() {
        return None;
    }
    let charset = if charset.is_empty() {
        "us-ascii"
    } else {
        charset
    };

    Some(decode_words(&format!(
        "=?{charset}?Q?{}?=",
        text.replace('%', "=")
    )))
}
