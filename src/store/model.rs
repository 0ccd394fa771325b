use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::repository::{FlagList, LocalId, Uid};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: Option<String>,
    pub address: String,
}

impl Address {
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name,
            address: address.into(),
        }
    }
}

/// Canonical per-message metadata.
///
/// Everything except `flags`, `snippet` and the download estimate is fixed
/// once the message has been chewed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub id: LocalId,
    pub srvid: Uid,
    /// `<folder id>/<local id>`
    pub suid: String,
    /// Message-Id without angle brackets.
    pub guid: Option<String>,
    pub author: Address,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub reply_to: Vec<Address>,
    pub date: Timestamp,
    pub flags: FlagList,
    pub has_attachments: bool,
    pub subject: Option<String>,
    pub snippet: Option<String>,
    pub bytes_to_download_for_body_display: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Plain,
    Html,
}

/// What is needed to fetch a body part later on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartFetchInfo {
    pub part_id: String,
    pub ty: String,
    pub subtype: String,
    pub params: Vec<(String, String)>,
    pub encoding: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyRep {
    pub kind: BodyKind,
    pub part: String,
    pub size_estimate: u64,
    pub amount_downloaded: u64,
    /// Zero sized parts count as downloaded, the estimate alone is not
    /// reliable.
    pub is_downloaded: bool,
    pub part_info: Option<PartFetchInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub name: String,
    pub content_id: Option<String>,
    /// Full MIME type, e.g. `image/png`.
    pub ty: String,
    pub part: String,
    pub encoding: String,
    pub size_estimate: u64,
    /// Local copy once downloaded.
    pub file: Option<String>,
}

/// Structural metadata needed to fetch bodies later.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyInfo {
    pub date: Timestamp,
    pub size: u64,
    pub attachments: Vec<AttachmentInfo>,
    pub related_parts: Vec<AttachmentInfo>,
    pub references: Vec<String>,
    pub body_reps: Vec<BodyRep>,
}

impl BodyInfo {
    /// Bytes still missing before the body can be displayed: unfinished body
    /// reps plus related parts without a local copy.
    pub fn bytes_to_download_for_display(&self) -> u64 {
        let reps = self
            .body_reps
            .iter()
            .filter(|rep| !rep.is_downloaded)
            .map(|rep| rep.size_estimate.saturating_sub(rep.amount_downloaded));
        let related = self
            .related_parts
            .iter()
            .filter(|part| part.file.is_none())
            .map(|part| part.size_estimate);

        reps.chain(related).sum()
    }
}
