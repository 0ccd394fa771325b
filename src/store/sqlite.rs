use std::{
    fs::create_dir_all,
    io,
    path::{Path, PathBuf},
};

use include_dir::{Dir, include_dir};
use jiff::Timestamp;
use log::{debug, trace, warn};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use rusqlite_migration::Migrations;
use tokio::sync::{Mutex, broadcast};

use crate::{
    repository::{LocalId, Uid},
    store::{BodyInfo, HeaderInfo, MessageStore, StoreError, StoreEvent},
};

static MIGRATIONS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

const DB_FILE: &str = "foldersync.db";

#[derive(Debug)]
enum Deferred {
    Add {
        header: HeaderInfo,
        body: BodyInfo,
    },
    Update {
        date: Timestamp,
        header: HeaderInfo,
        body: Option<BodyInfo>,
    },
    Unchanged(LocalId),
    AdjustUnread(i64),
}

fn sql_id(id: LocalId) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(StoreError::Inconsistent)
}

/// Folder state in a SQLite database at `<statedir>/<folder>/foldersync.db`.
///
/// Every write is deferred and applied in a single transaction by
/// [`MessageStore::flush_deferred_operations`]. Subscribers receive the
/// resulting [`StoreEvent`]s after the transaction committed.
#[derive(Debug)]
pub struct SqliteStore {
    folder_id: String,
    db: Mutex<Connection>,
    next_id: Mutex<u64>,
    deferred: Mutex<Vec<Deferred>>,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    pub fn folder_dir(state_dir: &Path, folder_id: &str) -> PathBuf {
        state_dir.join(folder_id)
    }

    /// Opens the folder's database, creating and migrating it as needed.
    pub fn open(state_dir: &Path, folder_id: &str) -> Result<Self, StoreError> {
        let folder_dir = Self::folder_dir(state_dir, folder_id);
        create_dir_all(&folder_dir)?;
        let state_file = folder_dir.join(DB_FILE);
        debug!("opening state file {}", state_file.to_string_lossy());

        let mut db = Connection::open_with_flags(
            state_file,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        db.execute_batch(
            "pragma journal_mode=wal;
            pragma synchronous=1;
            pragma foreign_keys=on;",
        )?;
        Migrations::from_directory(&MIGRATIONS)?.to_latest(&mut db)?;
        db.execute(
            "insert or ignore into folder_meta (folder_id, unread_count) values (?1, 0)",
            [folder_id],
        )?;

        let next_id: i64 =
            db.query_one("select coalesce(max(id), 0) + 1 from headers", [], |row| {
                row.get(0)
            })?;
        let next_id = u64::try_from(next_id)
            .map_err(|_| StoreError::Inconsistent("header ids should be positive"))?;
        let (events, _) = broadcast::channel(1024);

        Ok(Self {
            folder_id: folder_id.to_string(),
            db: Mutex::new(db),
            next_id: Mutex::new(next_id),
            deferred: Mutex::new(Vec::new()),
            events,
        })
    }

    /// Deletes all state of a folder.
    pub fn remove(state_dir: &Path, folder_id: &str) -> io::Result<()> {
        let folder_dir = Self::folder_dir(state_dir, folder_id);
        debug!("removing {}", folder_dir.to_string_lossy());
        std::fs::remove_dir_all(folder_dir)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Stored headers for the given uids, in the order of `uids`. Uids
    /// without a header are left out.
    pub async fn known_headers(&self, uids: &[Uid]) -> Result<Vec<HeaderInfo>, StoreError> {
        trace!("looking up {} uids", uids.len());
        let db = self.db.lock().await;
        let mut stmt = db.prepare_cached("select header from headers where srvid = ?1 order by id limit 1")?;
        let mut headers = Vec::with_capacity(uids.len());
        for uid in uids {
            let header: Option<String> = stmt
                .query_row([u32::from(*uid)], |row| row.get(0))
                .optional()?;
            if let Some(header) = header {
                headers.push(serde_json::from_str(&header)?);
            }
        }

        Ok(headers)
    }

    pub async fn body(&self, id: LocalId) -> Result<Option<BodyInfo>, StoreError> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare_cached("select body from bodies where id = ?1")?;
        let body: Option<String> = stmt
            .query_one([sql_id(id)?], |row| row.get(0))
            .optional()?;

        Ok(body.as_deref().map(serde_json::from_str).transpose()?)
    }

    pub async fn unread_count(&self) -> Result<i64, StoreError> {
        let db = self.db.lock().await;
        Ok(db.query_one(
            "select unread_count from folder_meta where folder_id = ?1",
            [&self.folder_id],
            |row| row.get(0),
        )?)
    }

    async fn defer(&self, operation: Deferred) {
        trace!("deferring {operation:?}");
        self.deferred.lock().await.push(operation);
    }

    fn bump_unread_count(&self, tx: &Connection, delta: i64) -> Result<StoreEvent, StoreError> {
        let unread_count: i64 = tx
            .prepare_cached(
                "update folder_meta set unread_count = unread_count + ?1
                where folder_id = ?2 returning unread_count",
            )?
            .query_one((delta, &self.folder_id), |row| row.get(0))?;
        Ok(StoreEvent::UnreadCountChanged(unread_count))
    }

    fn apply(
        &self,
        tx: &Connection,
        operation: Deferred,
        events: &mut Vec<StoreEvent>,
    ) -> Result<(), StoreError> {
        match operation {
            Deferred::Add { header, body } => {
                let id = sql_id(header.id)?;
                let inserted = tx
                    .prepare_cached(
                        "insert or ignore into headers (id, srvid, date, flags, header)
                        values (?1, ?2, ?3, ?4, ?5)",
                    )?
                    .execute((
                        id,
                        u32::from(header.srvid),
                        header.date.as_second(),
                        header.flags.to_string(),
                        serde_json::to_string(&header)?,
                    ))?;
                if inserted == 0 {
                    return Err(StoreError::Duplicate(header.id));
                }
                tx.prepare_cached("insert into bodies (id, body) values (?1, ?2)")?
                    .execute((id, serde_json::to_string(&body)?))?;
                events.push(StoreEvent::Added {
                    id: header.id,
                    srvid: header.srvid,
                });
                if !header.flags.is_seen() {
                    events.push(self.bump_unread_count(tx, 1)?);
                }
            }
            Deferred::Update { date, header, body } => {
                let id = sql_id(header.id)?;
                let updated = tx
                    .prepare_cached("update headers set date=?1, flags=?2, header=?3 where id=?4")?
                    .execute((
                        date.as_second(),
                        header.flags.to_string(),
                        serde_json::to_string(&header)?,
                        id,
                    ))?;
                if updated == 0 {
                    return Err(StoreError::UnknownHeader(header.id));
                }
                if let Some(body) = body {
                    tx.prepare_cached("insert or replace into bodies (id, body) values (?1, ?2)")?
                        .execute((id, serde_json::to_string(&body)?))?;
                }
                events.push(StoreEvent::Updated(header.id));
            }
            Deferred::Unchanged(id) => events.push(StoreEvent::Unchanged(id)),
            Deferred::AdjustUnread(delta) => events.push(self.bump_unread_count(tx, delta)?),
        }

        Ok(())
    }
}

impl MessageStore for SqliteStore {
    fn folder_id(&self) -> &str {
        &self.folder_id
    }

    async fn issue_local_id(&self) -> LocalId {
        let mut next_id = self.next_id.lock().await;
        let id = LocalId::new(*next_id);
        *next_id += 1;
        id
    }

    async fn add_message(&self, header: HeaderInfo, body: BodyInfo) -> Result<(), StoreError> {
        self.defer(Deferred::Add { header, body }).await;
        Ok(())
    }

    async fn update_header(
        &self,
        date: Timestamp,
        id: LocalId,
        _part_of_bulk_sync: bool,
        header: &HeaderInfo,
        body_hint: Option<&BodyInfo>,
    ) -> Result<(), StoreError> {
        if header.id != id {
            return Err(StoreError::Inconsistent("header should carry the updated id"));
        }
        self.defer(Deferred::Update {
            date,
            header: header.clone(),
            body: body_hint.cloned(),
        })
        .await;
        Ok(())
    }

    async fn mark_header_unchanged(&self, header: &HeaderInfo) {
        self.defer(Deferred::Unchanged(header.id)).await;
    }

    async fn adjust_unread_count(&self, delta: i64) -> Result<(), StoreError> {
        self.defer(Deferred::AdjustUnread(delta)).await;
        Ok(())
    }

    /// Applies deferred writes in one transaction. Each write gets its own
    /// savepoint; one that fails is logged and rolled back, the others still
    /// commit.
    async fn flush_deferred_operations(&self) -> Result<(), StoreError> {
        let deferred = std::mem::take(&mut *self.deferred.lock().await);
        debug!("flushing {} deferred operations", deferred.len());

        let mut events = Vec::with_capacity(deferred.len());
        {
            let mut db = self.db.lock().await;
            let mut tx = db.transaction()?;
            for operation in deferred {
                let savepoint = tx.savepoint()?;
                let published = events.len();
                match self.apply(&savepoint, operation, &mut events) {
                    Ok(()) => savepoint.commit()?,
                    Err(error) => {
                        warn!("dropping deferred write: {error}");
                        events.truncate(published);
                    }
                }
            }
            tx.commit()?;
        }

        for event in events {
            if self.events.send(event).is_err() {
                trace!("no subscriber for store events");
            }
        }

        Ok(())
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if let Err(error) = self.db.get_mut().execute_batch("pragma optimize;") {
            warn!("optimizing state db failed: {error}");
        }
    }
}
