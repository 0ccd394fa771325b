use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::{
    chew::ImapChewer,
    config::Config,
    imap::TranscriptConnection,
    repository::{SequenceSet, Uid},
    store::SqliteStore,
    sync::{SyncPass, SyncPlan, SyncSummary},
};

/// Runs one pass for `folder`, answering fetches from a recorded transcript.
pub fn sync_folder(
    config: &Config,
    folder: &str,
    transcript: &Path,
    uids: &SequenceSet,
) -> Result<SyncSummary> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("tokio runtime should be buildable")?;

    rt.block_on(async {
        let store = SqliteStore::open(config.statedir(), folder)
            .with_context(|| format!("opening state of {folder}"))?;
        let connection = TranscriptConnection::load(transcript)
            .await
            .with_context(|| format!("loading transcript {}", transcript.display()))?;

        let uids = uids.iter().collect::<Vec<Uid>>();
        let stored = store.known_headers(&uids).await?;
        let plan = SyncPlan::partition(&uids, stored);
        info!(
            "{} new and {} known messages requested",
            plan.new_uids().len(),
            plan.known_uids().len()
        );
        let input = plan.into_input(config.starting_progress())?;

        let summary = SyncPass::new(&connection, &store, &ImapChewer, *config.cost(), input)
            .run(|progress| info!("{:.0}% synced", progress * 100.0))
            .await;
        info!("{} unread in {folder}", store.unread_count().await?);

        Ok(summary)
    })
}
