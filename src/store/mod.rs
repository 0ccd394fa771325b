mod memory;
mod model;
mod sqlite;

pub use memory::HeaderUpdate;
pub use memory::MemoryStore;
pub use model::Address;
pub use model::AttachmentInfo;
pub use model::BodyInfo;
pub use model::BodyKind;
pub use model::BodyRep;
pub use model::HeaderInfo;
pub use model::PartFetchInfo;
pub use sqlite::SqliteStore;

use std::io;

use jiff::Timestamp;
use thiserror::Error;

use crate::repository::{LocalId, Uid};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no header stored under {0}")]
    UnknownHeader(LocalId),
    #[error("message {0} is already stored")]
    Duplicate(LocalId),
    #[error("stored data is inconsistent: {0}")]
    Inconsistent(&'static str),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Migration(#[from] rusqlite_migration::Error),
    #[error("stored record is not readable: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO issue with state directory: {0}")]
    Io(#[from] io::Error),
}

/// Change notifications, published once deferred writes are flushed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Added { id: LocalId, srvid: Uid },
    Updated(LocalId),
    Unchanged(LocalId),
    UnreadCountChanged(i64),
}

/// Local message storage of one folder.
///
/// Writes may be deferred. `flush_deferred_operations` applies every deferred
/// write and then publishes the resulting [`StoreEvent`]s, so anybody reading
/// after the flush sees the complete picture.
pub trait MessageStore {
    fn folder_id(&self) -> &str;

    async fn issue_local_id(&self) -> LocalId;

    /// Stores a new message. Header and body info become visible together.
    /// A message without `\Seen` counts towards the folder's unread count.
    async fn add_message(&self, header: HeaderInfo, body: BodyInfo) -> Result<(), StoreError>;

    async fn update_header(
        &self,
        date: Timestamp,
        id: LocalId,
        part_of_bulk_sync: bool,
        header: &HeaderInfo,
        body_hint: Option<&BodyInfo>,
    ) -> Result<(), StoreError>;

    /// Records that a header was looked at without being modified.
    async fn mark_header_unchanged(&self, header: &HeaderInfo);

    async fn adjust_unread_count(&self, delta: i64) -> Result<(), StoreError>;

    async fn flush_deferred_operations(&self) -> Result<(), StoreError>;
}
