use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io,
};

use enumflags2::{BitFlags, bitflags};
use thiserror::Error;

use crate::{
    imap::ServerRecord,
    repository::{SequenceSet, Uid},
};

/// Header fields fetched for new messages. ENVELOPE is avoided because some
/// servers produce broken envelopes.
pub const SYNC_HEADER_FIELDS: [&str; 8] = [
    "FROM",
    "TO",
    "CC",
    "BCC",
    "SUBJECT",
    "REPLY-TO",
    "MESSAGE-ID",
    "REFERENCES",
];

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FetchItem {
    Uid,
    Flags,
    BodyStructure,
    InternalDate,
    HeaderFields,
}

impl Display for FetchItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FetchItem::Uid => write!(f, "UID"),
            FetchItem::Flags => write!(f, "FLAGS"),
            FetchItem::BodyStructure => write!(f, "BODYSTRUCTURE"),
            FetchItem::InternalDate => write!(f, "INTERNALDATE"),
            FetchItem::HeaderFields => {
                write!(f, "BODY.PEEK[HEADER.FIELDS ({})]", SYNC_HEADER_FIELDS.join(" "))
            }
        }
    }
}

/// Data items requested per message.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FieldSpec(BitFlags<FetchItem>);

impl FieldSpec {
    pub fn new_messages() -> Self {
        Self(
            FetchItem::Uid
                | FetchItem::Flags
                | FetchItem::BodyStructure
                | FetchItem::InternalDate
                | FetchItem::HeaderFields,
        )
    }

    pub fn flags_only() -> Self {
        Self(FetchItem::Uid | FetchItem::Flags)
    }

    pub fn contains(self, item: FetchItem) -> bool {
        self.0.contains(item)
    }
}

impl Display for FieldSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut items = self.0.iter();
        if let Some(first) = items.next() {
            write!(f, "{first}")?;
        }
        for item in items {
            write!(f, " {item}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FetchRequest<'a> {
    uids: &'a [Uid],
    fields: FieldSpec,
    by_uid: bool,
}

impl<'a> FetchRequest<'a> {
    pub fn new(uids: &'a [Uid], fields: FieldSpec) -> Self {
        Self {
            uids,
            fields,
            by_uid: true,
        }
    }

    #[must_use]
    pub fn by_uid(mut self, by_uid: bool) -> Self {
        self.by_uid = by_uid;
        self
    }

    pub fn uids(&self) -> &'a [Uid] {
        self.uids
    }

    pub fn fields(&self) -> FieldSpec {
        self.fields
    }

    pub fn is_by_uid(&self) -> bool {
        self.by_uid
    }
}

impl Display for FetchRequest<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.by_uid {
            write!(f, "UID ")?;
        }
        write!(f, "FETCH ")?;
        if let Ok(set) = SequenceSet::try_from(self.uids) {
            write!(f, "{set}")?;
        }
        write!(f, " ({})", self.fields)
    }
}

/// Final status of a tagged server response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Completion {
    Ok,
    No,
    Bad,
}

impl Display for Completion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Completion::Ok => write!(f, "OK"),
            Completion::No => write!(f, "NO"),
            Completion::Bad => write!(f, "BAD"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server answered fetch with {status}: {information:?}")]
    Rejected {
        status: Completion,
        information: Option<String>,
    },
    #[error("connection closed by server: {0:?}")]
    Disconnected(Option<String>),
    #[error("unparsable server response: {0}")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Connection able to fetch message metadata for a batch of messages.
///
/// Takes `&self` so that several requests can be outstanding on one
/// connection at a time.
pub trait FetchMetadata {
    async fn fetch_metadata(
        &self,
        request: &FetchRequest<'_>,
    ) -> Result<Vec<ServerRecord>, FetchError>;
}
