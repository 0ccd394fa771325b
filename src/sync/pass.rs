use std::fmt::Display;

use derive_builder::Builder;
use log::{debug, error, info, warn};
use tokio::{sync::mpsc, task};

use crate::{
    chew::HeaderNormalizer,
    imap::FetchMetadata,
    repository::Uid,
    store::{HeaderInfo, MessageStore},
    sync::{
        CostModel, KnownMessageReconciler, NewMessageFetcher, PassEvent, PassState,
        ProgressTracker, Reporter, SubSync, Trigger,
    },
};

pub const DEFAULT_STARTING_PROGRESS: f64 = 0.25;

/// What one pass works on.
///
/// `known_headers[i]` is the stored header of `known_uids[i]`. The new and
/// known sets are not checked against each other.
#[derive(Builder, Clone, Debug)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct PassInput {
    #[builder(default)]
    new_uids: Vec<Uid>,
    #[builder(default)]
    known_uids: Vec<Uid>,
    #[builder(default)]
    known_headers: Vec<HeaderInfo>,
    #[builder(default = "DEFAULT_STARTING_PROGRESS")]
    starting_progress: f64,
}

impl PassInputBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.starting_progress {
            Some(progress) if !(0.0..=1.0).contains(&progress) => {
                return Err(format!("starting progress {progress} is outside of [0, 1]"));
            }
            _ => {}
        }
        let uids = self.known_uids.as_deref().unwrap_or_default();
        let headers = self.known_headers.as_deref().unwrap_or_default();
        if uids.len() != headers.len() {
            return Err(format!(
                "{} known uids but {} known headers",
                uids.len(),
                headers.len()
            ));
        }
        if let Some((position, (uid, header))) = uids
            .iter()
            .zip(headers)
            .enumerate()
            .find(|(_, (uid, header))| header.srvid != **uid)
        {
            return Err(format!(
                "known header {position} has uid {} but was listed as {uid}",
                header.srvid
            ));
        }
        Ok(())
    }
}

/// Number of identifiers each sub-sync was handed, independent of how many
/// of them could actually be processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub new_messages: usize,
    pub known_messages: usize,
}

impl Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} new and {} known messages",
            self.new_messages, self.known_messages
        )
    }
}

/// One synchronisation pass over a folder: new messages are fetched and
/// stored while the flags of known ones are reconciled, then deferred store
/// writes are flushed.
pub struct SyncPass<'a, C, S, N> {
    connection: &'a C,
    store: &'a S,
    normalizer: &'a N,
    cost_model: CostModel,
    input: PassInput,
}

fn transition(state: PassState, trigger: Trigger) -> PassState {
    match state.on(trigger) {
        Ok(next) => {
            debug!("sync pass {state:?} -> {next:?}");
            next
        }
        Err(error) => {
            error!("sync pass state machine violated: {error}");
            state
        }
    }
}

impl<'a, C, S, N> SyncPass<'a, C, S, N>
where
    C: FetchMetadata,
    S: MessageStore,
    N: HeaderNormalizer,
{
    pub fn new(
        connection: &'a C,
        store: &'a S,
        normalizer: &'a N,
        cost_model: CostModel,
        input: PassInput,
    ) -> Self {
        Self {
            connection,
            store,
            normalizer,
            cost_model,
            input,
        }
    }

    /// Runs the pass to completion. `on_progress` receives the overall
    /// progress in `[starting_progress, 1]` whenever a sub-sync reports.
    ///
    /// Failures of single messages or whole batches are logged and skipped,
    /// the returned summary is the only completion signal.
    pub async fn run(self, mut on_progress: impl FnMut(f64)) -> SyncSummary {
        let PassInput {
            new_uids,
            known_uids,
            known_headers,
            starting_progress,
        } = self.input;
        let store = self.store;
        let summary = SyncSummary {
            new_messages: new_uids.len(),
            known_messages: known_uids.len(),
        };
        let mut tracker = ProgressTracker::new(
            starting_progress,
            self.cost_model.total(new_uids.len(), known_uids.len()),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let new_reporter = (!new_uids.is_empty()).then(|| Reporter::new(tx.clone(), SubSync::New));
        let known_reporter =
            (!known_uids.is_empty()).then(|| Reporter::new(tx.clone(), SubSync::Known));
        let dispatched = Trigger::Dispatched {
            new: new_reporter.is_some(),
            known: known_reporter.is_some(),
        };
        drop(tx);

        let fetcher =
            NewMessageFetcher::new(self.connection, store, self.normalizer, self.cost_model);
        let reconciler = KnownMessageReconciler::new(self.connection, store, self.cost_model);

        let new_sync = async {
            match new_reporter {
                Some(reporter) => Some(fetcher.run(&new_uids, reporter).await),
                None => None,
            }
        };
        let known_sync = async {
            match known_reporter {
                Some(reporter) => Some(reconciler.run(&known_uids, known_headers, reporter).await),
                None => None,
            }
        };
        let coordinate = async {
            // both sub-syncs get to issue their requests before anything is waited on
            task::yield_now().await;
            let mut state = transition(PassState::Idle, dispatched);
            while state.is_fetching() {
                match rx.recv().await {
                    Some(PassEvent::Progress(cost)) => {
                        if let Some(progress) = tracker.consume(cost) {
                            on_progress(progress);
                        }
                    }
                    Some(PassEvent::Done(SubSync::New)) => {
                        state = transition(state, Trigger::NewDone);
                    }
                    Some(PassEvent::Done(SubSync::Known)) => {
                        state = transition(state, Trigger::KnownDone);
                    }
                    None => {
                        error!("sub-syncs of {} stopped without finishing", store.folder_id());
                        state = PassState::Flushing;
                    }
                }
            }

            if let Err(error) = store.flush_deferred_operations().await {
                warn!("flushing {} failed: {error}", store.folder_id());
            }
            let state = transition(state, Trigger::FlushComplete);
            task::yield_now().await;
            state
        };

        let (stored, reconciled, state) = futures::join!(new_sync, known_sync, coordinate);
        if let Some(stored) = stored {
            debug!("{stored} of {} new messages stored", summary.new_messages);
        }
        if let Some(reconciled) = reconciled {
            debug!("known messages: {reconciled:?}");
        }
        info!("synced {summary} in {} ({state:?})", store.folder_id());

        summary
    }
}
