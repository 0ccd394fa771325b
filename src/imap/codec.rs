use bytes::{Buf, Bytes, BytesMut};
use imap_proto::{AttributeValue, Response, Status};
use log::{trace, warn};
use tokio_util::codec::Decoder;

use crate::{
    imap::{BodyPart, Completion, FetchError, ServerRecord, ServerRecordBuilder},
    repository::{FlagList, Uid},
};

/// Server response reduced to what a fetch needs.
#[derive(Debug)]
pub enum ResponseFrame {
    Fetch(ServerRecord),
    Completed {
        tag: String,
        status: Completion,
        information: Option<String>,
    },
    Bye(Option<String>),
    Other,
}

/// Decodes raw server output into [`ResponseFrame`]s.
///
/// Frames are converted into owned data while the parse result still borrows
/// the read buffer, so nothing outlives the buffer.
#[derive(Debug, Default)]
pub struct ResponseCodec;

fn record_from_attributes(attributes: &[AttributeValue<'_>]) -> Option<ServerRecord> {
    let mut builder = ServerRecordBuilder::default();
    let mut has_uid = false;
    for attribute in attributes {
        match attribute {
            AttributeValue::Uid(uid) => {
                if let Ok(uid) = Uid::try_from(uid) {
                    builder.uid(uid);
                    has_uid = true;
                }
            }
            AttributeValue::Flags(flags) => {
                builder.flags(FlagList::new(flags.iter().map(ToString::to_string)));
            }
            AttributeValue::InternalDate(date) => {
                builder.internal_date(date.to_string());
            }
            AttributeValue::BodyStructure(structure) => {
                builder.structure(BodyPart::from(structure));
            }
            AttributeValue::BodySection {
                data: Some(data), ..
            }
            | AttributeValue::Rfc822Header(Some(data)) => {
                builder.header_fields(Bytes::copy_from_slice(data));
            }
            _ => {
                trace!("ignoring fetch attribute {attribute:?}");
            }
        }
    }
    if !has_uid {
        warn!("FETCH response without UID. ignoring");
        return None;
    }
    builder.build().ok()
}

impl From<&Response<'_>> for ResponseFrame {
    fn from(value: &Response<'_>) -> Self {
        match value {
            Response::Fetch(_, attributes) => {
                record_from_attributes(attributes).map_or(ResponseFrame::Other, ResponseFrame::Fetch)
            }
            Response::Done {
                tag,
                status,
                information,
                ..
            } => {
                let information = information.as_ref().map(ToString::to_string);
                let status = match status {
                    Status::Ok => Completion::Ok,
                    Status::No => Completion::No,
                    Status::Bad => Completion::Bad,
                    Status::PreAuth | Status::Bye => {
                        warn!("tagged {status:?} is not allowed. treating as BAD");
                        Completion::Bad
                    }
                };
                ResponseFrame::Completed {
                    tag: tag.0.clone(),
                    status,
                    information,
                }
            }
            Response::Data {
                status: Status::Bye,
                information,
                ..
            } => ResponseFrame::Bye(information.as_ref().map(ToString::to_string)),
            _ => {
                trace!("ignoring unhandled response {value:?}");
                ResponseFrame::Other
            }
        }
    }
}

impl Decoder for ResponseCodec {
    type Item = ResponseFrame;
    type Error = FetchError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }
        let (consumed, frame) = match imap_proto::parser::parse_response(&buf[..]) {
            Ok((rest, response)) => (buf.len() - rest.len(), ResponseFrame::from(&response)),
            Err(nom::Err::Incomplete(_)) => return Ok(None),
            Err(error) => return Err(FetchError::Parse(format!("{error:?}"))),
        };
        buf.advance(consumed);

        Ok(Some(frame))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.iter().all(u8::is_ascii_whitespace) {
            buf.clear();
            return Ok(None);
        }
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None => Err(FetchError::Parse(format!(
                "{} trailing bytes of incomplete response",
                buf.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;
    use crate::imap::LeafPart;

    fn decode_all(raw: &str) -> Vec<ResponseFrame> {
        let mut codec = ResponseCodec;
        let mut buf = BytesMut::from(raw.as_bytes());
        let mut frames = Vec::new();
        while let Some(frame) = assert_ok!(codec.decode_eof(&mut buf)) {
            frames.push(frame);
        }
        frames
    }

    #[rstest]
    fn test_decodes_flag_fetch() {
        let frames = decode_all("* 3 FETCH (UID 12 FLAGS (\\Seen \\Flagged))\r\n");

        assert_len_eq_x!(&frames, 1);
        let ResponseFrame::Fetch(record) = &frames[0] else {
            panic!("expected fetch frame, got {frames:?}");
        };
        assert_eq!(u32::from(record.uid()), 12);
        assert_eq!(record.flags(), &FlagList::new([r"\Flagged", r"\Seen"]));
        assert_none!(record.structure().as_ref());
    }

    #[rstest]
    fn test_decodes_structure_date_and_header_fields() {
        let header = "Subject: hello\r\nFrom: a@example.com\r\n\r\n";
        let raw = format!(
            "* 1 FETCH (UID 101 FLAGS () INTERNALDATE \"17-Jul-1996 02:44:25 -0700\" \
             BODYSTRUCTURE (\"TEXT\" \"PLAIN\" (\"CHARSET\" \"US-ASCII\") NIL NIL \"7BIT\" 3028 92) \
             BODY[HEADER.FIELDS (SUBJECT FROM)] {{{}}}\r\n{header})\r\n",
            header.len()
        );
        let frames = decode_all(&raw);

        let ResponseFrame::Fetch(record) = &frames[0] else {
            panic!("expected fetch frame, got {frames:?}");
        };
        assert_eq!(
            assert_some!(record.internal_date().as_ref()),
            "17-Jul-1996 02:44:25 -0700"
        );
        assert_eq!(
            assert_some!(record.header_fields().as_ref()).as_ref(),
            header.as_bytes()
        );
        let BodyPart::Leaf(LeafPart {
            part_id, ty, subtype, encoding, size, ..
        }) = assert_some!(record.structure().as_ref())
        else {
            panic!("expected a single leaf part");
        };
        assert_eq!(part_id, "1");
        assert_eq!(ty, "text");
        assert_eq!(subtype, "plain");
        assert_eq!(encoding, "7bit");
        assert_eq!(*size, 3028);
    }

    #[rstest]
    fn test_decodes_tagged_completion() {
        let frames = decode_all("A1 NO try again\r\n");

        assert_matches!(
            frames.as_slice(),
            [ResponseFrame::Completed {
                status: Completion::No,
                ..
            }]
        );
    }

    #[rstest]
    fn test_decodes_bye() {
        let frames = decode_all("* BYE shutting down\r\n");

        assert_matches!(frames.as_slice(), [ResponseFrame::Bye(Some(_))]);
    }

    #[rstest]
    fn test_waits_for_incomplete_response() {
        let mut codec = ResponseCodec;
        let mut buf = BytesMut::from(&b"* 3 FETCH (UID 12 FL"[..]);

        assert_none!(assert_ok!(codec.decode(&mut buf)));
        assert_err!(codec.decode_eof(&mut buf));
    }
}
