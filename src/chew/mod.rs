mod date;
mod header;
mod structure;

pub use date::parse_imap_date_time;
pub use header::HeaderFields;
pub use structure::ChewedStructure;
pub use structure::chew_structure;

use log::trace;
use thiserror::Error;

use crate::{
    imap::ServerRecord,
    repository::LocalId,
    store::{Address, BodyInfo, HeaderInfo},
};

/// Sender used when a message names none, the header needs an author.
pub const MISSING_AUTHOR: &str = "missing-address@example.com";

#[derive(Debug, Error, PartialEq)]
pub enum ChewError {
    #[error("FETCH response lacks BODYSTRUCTURE")]
    MissingStructure,
    #[error("FETCH response lacks INTERNALDATE")]
    MissingInternalDate,
    #[error("not a valid IMAP date-time: {0:?}")]
    InvalidDate(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChewedMessage {
    pub header: HeaderInfo,
    pub body_info: BodyInfo,
}

/// Turns a server record into the header and body info kept locally.
pub trait HeaderNormalizer {
    fn normalize(
        &self,
        record: &ServerRecord,
        folder_id: &str,
        id: LocalId,
    ) -> Result<ChewedMessage, ChewError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ImapChewer;

impl HeaderNormalizer for ImapChewer {
    fn normalize(
        &self,
        record: &ServerRecord,
        folder_id: &str,
        id: LocalId,
    ) -> Result<ChewedMessage, ChewError> {
        trace!("chewing {} as {id}", record.uid());
        let structure = record
            .structure()
            .as_ref()
            .ok_or(ChewError::MissingStructure)?;
        let date = record
            .internal_date()
            .as_deref()
            .ok_or(ChewError::MissingInternalDate)
            .and_then(parse_imap_date_time)?;

        let ChewedStructure {
            body_reps,
            attachments,
            related_parts,
        } = chew_structure(structure);
        let HeaderFields {
            from,
            to,
            cc,
            bcc,
            reply_to,
            subject,
            message_id,
            references,
        } = HeaderFields::parse(record.header_fields().as_deref());

        let header = HeaderInfo {
            id,
            srvid: record.uid(),
            suid: format!("{folder_id}/{id}"),
            guid: message_id,
            author: from
                .into_iter()
                .next()
                .unwrap_or_else(|| Address::new(None, MISSING_AUTHOR)),
            to,
            cc,
            bcc,
            reply_to,
            date,
            flags: record.flags().clone(),
            has_attachments: !attachments.is_empty(),
            subject,
            snippet: None,
            bytes_to_download_for_body_display: 0,
        };
        let body_info = BodyInfo {
            date,
            size: 0,
            attachments,
            related_parts,
            references,
            body_reps,
        };

        Ok(ChewedMessage { header, body_info })
    }
}
