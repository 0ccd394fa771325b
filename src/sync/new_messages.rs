use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    chew::{ChewError, HeaderNormalizer},
    imap::{FetchMetadata, FetchRequest, FieldSpec, ServerRecord},
    repository::Uid,
    store::{MessageStore, StoreError},
    sync::{CostModel, Reporter},
};

#[derive(Debug, Error)]
enum ItemError {
    #[error("chewing failed: {0}")]
    Chew(#[from] ChewError),
    #[error("storing failed: {0}")]
    Store(#[from] StoreError),
}

/// Fetches and stores messages the folder has never seen.
pub struct NewMessageFetcher<'a, C, S, N> {
    connection: &'a C,
    store: &'a S,
    normalizer: &'a N,
    cost_model: CostModel,
}

impl<'a, C, S, N> NewMessageFetcher<'a, C, S, N>
where
    C: FetchMetadata,
    S: MessageStore,
    N: HeaderNormalizer,
{
    pub fn new(connection: &'a C, store: &'a S, normalizer: &'a N, cost_model: CostModel) -> Self {
        Self {
            connection,
            store,
            normalizer,
            cost_model,
        }
    }

    /// Fetches all `uids` in one batch and stores every message that can be
    /// chewed, in the order the server answered. Returns how many were
    /// stored.
    ///
    /// A failing batch stores nothing and reports no progress. Either way
    /// `reporter` is told the sub-sync is done.
    pub async fn run(&self, uids: &[Uid], reporter: Reporter) -> usize {
        let request = FetchRequest::new(uids, FieldSpec::new_messages());
        let stored = match self.connection.fetch_metadata(&request).await {
            Ok(records) => {
                let received = records.len();
                let mut stored = 0;
                for record in records {
                    let uid = record.uid();
                    match self.store_record(record).await {
                        Ok(()) => stored += 1,
                        Err(error) => warn!("skipping new message {uid}: {error}"),
                    }
                }
                info!(
                    "stored {stored} of {received} new messages in {}",
                    self.store.folder_id()
                );
                // responses arrive in a burst, so progress is reported in one go
                reporter.progress(self.cost_model.new_batch_cost(uids.len()));
                stored
            }
            Err(error) => {
                warn!("fetching new messages failed, ideally harmless: {error}");
                0
            }
        };
        reporter.done();

        stored
    }

    async fn store_record(&self, mut record: ServerRecord) -> Result<(), ItemError> {
        record.strip_recent();
        let id = self.store.issue_local_id().await;
        let mut chewed = self
            .normalizer
            .normalize(&record, self.store.folder_id(), id)?;
        chewed.header.bytes_to_download_for_body_display =
            chewed.body_info.bytes_to_download_for_display();
        debug!(
            "storing uid {} as {id}, {} bytes to download",
            record.uid(),
            chewed.header.bytes_to_download_for_body_display
        );
        self.store
            .add_message(chewed.header, chewed.body_info)
            .await?;

        Ok(())
    }
}
