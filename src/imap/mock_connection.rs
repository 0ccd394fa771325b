use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
};

use assertables::*;
use bytes::Bytes;
use tokio::task;

use crate::{
    imap::{
        BodyPart, Completion, FetchError, FetchMetadata, FetchRequest, FieldSpec, LeafPart,
        ServerRecord, ServerRecordBuilder,
    },
    repository::{FlagList, Uid},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockEvent {
    Requested(FieldSpec),
    Answered(FieldSpec),
}

/// In-memory connection answering from per-field-spec record pools.
#[derive(Debug, Default)]
pub struct MockConnection {
    pools: HashMap<FieldSpec, Vec<ServerRecord>>,
    failing: BTreeSet<Uid>,
    requests: RefCell<Vec<(Vec<Uid>, FieldSpec)>>,
    events: RefCell<Vec<MockEvent>>,
}

impl MockConnection {
    pub fn with_records(mut self, fields: FieldSpec, records: Vec<ServerRecord>) -> Self {
        self.pools
            .entry(fields)
            .or_default()
            .extend(records);
        self
    }

    /// Any request naming one of these uids is answered with NO.
    pub fn failing_on(mut self, uids: impl IntoIterator<Item = u32>) -> Self {
        self.failing.extend(uids.into_iter().map(uid));
        self
    }

    pub fn requests(&self) -> Vec<(Vec<Uid>, FieldSpec)> {
        self.requests.borrow().clone()
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.borrow().clone()
    }
}

impl FetchMetadata for MockConnection {
    async fn fetch_metadata(
        &self,
        request: &FetchRequest<'_>,
    ) -> Result<Vec<ServerRecord>, FetchError> {
        self.requests
            .borrow_mut()
            .push((request.uids().to_vec(), request.fields()));
        self.events
            .borrow_mut()
            .push(MockEvent::Requested(request.fields()));

        task::yield_now().await;

        self.events
            .borrow_mut()
            .push(MockEvent::Answered(request.fields()));
        if request.uids().iter().any(|uid| self.failing.contains(uid)) {
            return Err(FetchError::Rejected {
                status: Completion::No,
                information: Some("mocked failure".to_string()),
            });
        }

        Ok(self
            .pools
            .get(&request.fields())
            .map(|pool| {
                pool.iter()
                    .filter(|record| request.uids().contains(&record.uid()))
                    .map(|record| {
                        let mut record = record.clone();
                        record.restrict_to(request.fields());
                        record
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn uid(num: u32) -> Uid {
    assert_ok!(Uid::try_from(num))
}

pub fn uids(nums: impl IntoIterator<Item = u32>) -> Vec<Uid> {
    nums.into_iter().map(uid).collect()
}

pub fn flag_record(num: u32, flags: &[&str]) -> ServerRecord {
    assert_ok!(
        ServerRecordBuilder::default()
            .uid(uid(num))
            .flags(FlagList::new(flags.iter().copied()))
            .build()
    )
}

pub fn new_message_record(num: u32, flags: &[&str]) -> ServerRecord {
    let header = format!(
        "From: Sender {num} <sender{num}@example.com>\r\n\
         To: rcpt@example.com\r\n\
         Subject: message {num}\r\n\
         Message-ID: <{num}@example.com>\r\n\r\n"
    );
    assert_ok!(
        ServerRecordBuilder::default()
            .uid(uid(num))
            .flags(FlagList::new(flags.iter().copied()))
            .internal_date("17-Jul-1996 02:44:25 -0700")
            .header_fields(Bytes::from(header))
            .structure(BodyPart::Leaf(LeafPart {
                part_id: "1".to_string(),
                ty: "text".to_string(),
                subtype: "plain".to_string(),
                params: vec![("charset".to_string(), "utf-8".to_string())],
                encoding: "7bit".to_string(),
                size: 1200,
                ..LeafPart::default()
            }))
            .build()
    )
}
