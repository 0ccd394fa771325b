use bytes::Bytes;
use derive_builder::Builder;
use derive_getters::Getters;

use crate::{
    imap::{BodyPart, FetchItem, FieldSpec},
    repository::{FlagList, Uid},
};

/// One message as reported by an untagged FETCH response.
#[derive(Debug, Clone, PartialEq, Builder, Getters)]
#[builder(setter(into))]
pub struct ServerRecord {
    #[getter(skip)]
    uid: Uid,
    #[builder(default)]
    flags: FlagList,
    #[builder(default, setter(strip_option))]
    structure: Option<BodyPart>,
    #[builder(default, setter(strip_option))]
    internal_date: Option<String>,
    #[builder(default, setter(strip_option))]
    header_fields: Option<Bytes>,
}

impl ServerRecord {
    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn strip_recent(&mut self) {
        self.flags.remove_recent();
    }

    /// Folds a later FETCH response for the same message into this one. Data
    /// items present in `later` replace ours, FLAGS always come from `later`.
    pub fn merge(&mut self, later: ServerRecord) {
        debug_assert_eq!(self.uid, later.uid, "only records of one message merge");
        self.flags = later.flags;
        if later.structure.is_some() {
            self.structure = later.structure;
        }
        if later.internal_date.is_some() {
            self.internal_date = later.internal_date;
        }
        if later.header_fields.is_some() {
            self.header_fields = later.header_fields;
        }
    }

    /// Forgets every data item `fields` did not ask for.
    pub fn restrict_to(&mut self, fields: FieldSpec) {
        if !fields.contains(FetchItem::Flags) {
            self.flags = FlagList::default();
        }
        if !fields.contains(FetchItem::BodyStructure) {
            self.structure = None;
        }
        if !fields.contains(FetchItem::InternalDate) {
            self.internal_date = None;
        }
        if !fields.contains(FetchItem::HeaderFields) {
            self.header_fields = None;
        }
    }
}
