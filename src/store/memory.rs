use std::collections::BTreeMap;

use jiff::Timestamp;
use log::trace;
use tokio::sync::Mutex;

use crate::{
    repository::LocalId,
    store::{BodyInfo, HeaderInfo, MessageStore, StoreError, StoreEvent},
};

/// One call of [`MessageStore::update_header`].
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderUpdate {
    pub date: Timestamp,
    pub id: LocalId,
    pub part_of_bulk_sync: bool,
    pub with_body_hint: bool,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    headers: BTreeMap<LocalId, HeaderInfo>,
    bodies: BTreeMap<LocalId, BodyInfo>,
    unread_count: i64,
    updates: Vec<HeaderUpdate>,
    pending: Vec<StoreEvent>,
    published: Vec<StoreEvent>,
    flushes: usize,
}

/// Store keeping everything in memory.
///
/// Writes apply immediately, their events are held back until the next flush.
#[derive(Debug)]
pub struct MemoryStore {
    folder_id: String,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: folder_id.into(),
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Seeds headers known from an earlier pass.
    #[must_use]
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = HeaderInfo>) -> Self {
        let inner = self.inner.get_mut();
        for header in headers {
            inner.next_id = inner.next_id.max(u64::from(header.id) + 1);
            inner.headers.insert(header.id, header);
        }
        self
    }

    #[must_use]
    pub fn with_unread_count(mut self, unread_count: i64) -> Self {
        self.inner.get_mut().unread_count = unread_count;
        self
    }

    pub async fn header(&self, id: LocalId) -> Option<HeaderInfo> {
        self.inner.lock().await.headers.get(&id).cloned()
    }

    pub async fn body(&self, id: LocalId) -> Option<BodyInfo> {
        self.inner.lock().await.bodies.get(&id).cloned()
    }

    pub async fn headers(&self) -> Vec<HeaderInfo> {
        self.inner.lock().await.headers.values().cloned().collect()
    }

    pub async fn unread_count(&self) -> i64 {
        self.inner.lock().await.unread_count
    }

    pub async fn updates(&self) -> Vec<HeaderUpdate> {
        self.inner.lock().await.updates.clone()
    }

    /// Events published by flushes so far.
    pub async fn events(&self) -> Vec<StoreEvent> {
        self.inner.lock().await.published.clone()
    }

    pub async fn pending_events(&self) -> Vec<StoreEvent> {
        self.inner.lock().await.pending.clone()
    }

    pub async fn flushes(&self) -> usize {
        self.inner.lock().await.flushes
    }
}

impl MessageStore for MemoryStore {
    fn folder_id(&self) -> &str {
        &self.folder_id
    }

    async fn issue_local_id(&self) -> LocalId {
        let mut inner = self.inner.lock().await;
        let id = LocalId::new(inner.next_id);
        inner.next_id += 1;
        id
    }

    async fn add_message(&self, header: HeaderInfo, body: BodyInfo) -> Result<(), StoreError> {
        trace!("adding message {} with uid {}", header.id, header.srvid);
        let mut inner = self.inner.lock().await;
        if inner.headers.contains_key(&header.id) {
            return Err(StoreError::Duplicate(header.id));
        }
        inner.pending.push(StoreEvent::Added {
            id: header.id,
            srvid: header.srvid,
        });
        if !header.flags.is_seen() {
            inner.unread_count += 1;
            let unread_count = inner.unread_count;
            inner
                .pending
                .push(StoreEvent::UnreadCountChanged(unread_count));
        }
        inner.bodies.insert(header.id, body);
        inner.headers.insert(header.id, header);
        Ok(())
    }

    async fn update_header(
        &self,
        date: Timestamp,
        id: LocalId,
        part_of_bulk_sync: bool,
        header: &HeaderInfo,
        body_hint: Option<&BodyInfo>,
    ) -> Result<(), StoreError> {
        trace!("updating header {id}");
        let mut inner = self.inner.lock().await;
        let stored = inner
            .headers
            .get_mut(&id)
            .ok_or(StoreError::UnknownHeader(id))?;
        stored.clone_from(header);
        if let Some(body) = body_hint {
            inner.bodies.insert(id, body.clone());
        }
        inner.updates.push(HeaderUpdate {
            date,
            id,
            part_of_bulk_sync,
            with_body_hint: body_hint.is_some(),
        });
        inner.pending.push(StoreEvent::Updated(id));
        Ok(())
    }

    async fn mark_header_unchanged(&self, header: &HeaderInfo) {
        trace!("header {} unchanged", header.id);
        self.inner
            .lock()
            .await
            .pending
            .push(StoreEvent::Unchanged(header.id));
    }

    async fn adjust_unread_count(&self, delta: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.unread_count += delta;
        let unread_count = inner.unread_count;
        inner
            .pending
            .push(StoreEvent::UnreadCountChanged(unread_count));
        Ok(())
    }

    async fn flush_deferred_operations(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let pending = std::mem::take(&mut inner.pending);
        trace!("publishing {} events", pending.len());
        inner.published.extend(pending);
        inner.flushes += 1;
        Ok(())
    }
}
