use std::borrow::Cow;

use imap_proto::{BodyContentCommon, BodyContentSinglePart, BodyStructure, ContentEncoding};

/// Owned MIME structure of a message as described by BODYSTRUCTURE.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyPart {
    Multipart(MultipartPart),
    Leaf(LeafPart),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MultipartPart {
    pub subtype: String,
    pub children: Vec<BodyPart>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LeafPart {
    /// IMAP part specifier, e.g. `1` or `2.1`.
    pub part_id: String,
    pub ty: String,
    pub subtype: String,
    pub params: Vec<(String, String)>,
    pub content_id: Option<String>,
    pub encoding: String,
    pub size: u32,
    pub disposition: Option<Disposition>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Disposition {
    pub ty: String,
    pub params: Vec<(String, String)>,
}

impl LeafPart {
    pub fn param(&self, name: &str) -> Option<&str> {
        find_param(&self.params, name)
    }

    pub fn disposition_param(&self, name: &str) -> Option<&str> {
        self.disposition
            .as_ref()
            .and_then(|disposition| find_param(&disposition.params, name))
    }
}

fn find_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn own_params(params: Option<&Vec<(Cow<'_, str>, Cow<'_, str>)>>) -> Vec<(String, String)> {
    params.map_or_else(Vec::new, |params| {
        params
            .iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value.to_string()))
            .collect()
    })
}

fn encoding_name(encoding: &ContentEncoding<'_>) -> String {
    match encoding {
        ContentEncoding::SevenBit => "7bit".to_string(),
        ContentEncoding::EightBit => "8bit".to_string(),
        ContentEncoding::Binary => "binary".to_string(),
        ContentEncoding::Base64 => "base64".to_string(),
        ContentEncoding::QuotedPrintable => "quoted-printable".to_string(),
        ContentEncoding::Other(other) => other.to_ascii_lowercase(),
    }
}

fn part_id(path: &[usize]) -> String {
    if path.is_empty() {
        "1".to_string()
    } else {
        path.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn leaf(common: &BodyContentCommon<'_>, other: &BodyContentSinglePart<'_>, path: &[usize]) -> LeafPart {
    LeafPart {
        part_id: part_id(path),
        ty: common.ty.ty.to_ascii_lowercase(),
        subtype: common.ty.subtype.to_ascii_lowercase(),
        params: own_params(common.ty.params.as_ref()),
        content_id: other.id.as_ref().map(ToString::to_string),
        encoding: encoding_name(&other.transfer_encoding),
        size: other.octets,
        disposition: common.disposition.as_ref().map(|disposition| Disposition {
            ty: disposition.ty.to_ascii_lowercase(),
            params: own_params(disposition.params.as_ref()),
        }),
    }
}

fn convert(structure: &BodyStructure<'_>, path: &mut Vec<usize>) -> BodyPart {
    match structure {
        BodyStructure::Multipart { common, bodies, .. } => {
            let mut children = Vec::with_capacity(bodies.len());
            for (index, body) in bodies.iter().enumerate() {
                path.push(index + 1);
                children.push(convert(body, path));
                path.pop();
            }
            BodyPart::Multipart(MultipartPart {
                subtype: common.ty.subtype.to_ascii_lowercase(),
                children,
            })
        }
        // message/rfc822 is kept as an opaque leaf; its inner structure is
        // never chewed.
        BodyStructure::Basic { common, other, .. }
        | BodyStructure::Text { common, other, .. }
        | BodyStructure::Message { common, other, .. } => BodyPart::Leaf(leaf(common, other, path)),
    }
}

impl From<&BodyStructure<'_>> for BodyPart {
    fn from(value: &BodyStructure<'_>) -> Self {
        convert(value, &mut Vec::new())
    }
}
