use log::{debug, info, trace, warn};

use crate::{
    imap::{FetchMetadata, FetchRequest, FieldSpec, ServerRecord},
    repository::{Uid, unread_delta},
    store::{HeaderInfo, MessageStore},
    sync::{CostModel, Reporter},
};

/// Outcome of reconciling one batch of known messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

/// Refreshes the flags of messages the folder already has.
pub struct KnownMessageReconciler<'a, C, S> {
    connection: &'a C,
    store: &'a S,
    cost_model: CostModel,
}

/// Index of the header a response belongs to. Servers may answer in any
/// order, so the position is only a first guess.
fn locate(position: usize, uid: Uid, uids: &[Uid], headers: &[HeaderInfo]) -> Option<usize> {
    if headers
        .get(position)
        .is_some_and(|header| header.srvid == uid)
    {
        return Some(position);
    }
    trace!("response {position} for uid {uid} is out of order");
    uids.iter()
        .position(|known| *known == uid)
        .filter(|index| *index < headers.len())
}

impl<'a, C, S> KnownMessageReconciler<'a, C, S>
where
    C: FetchMetadata,
    S: MessageStore,
{
    pub fn new(connection: &'a C, store: &'a S, cost_model: CostModel) -> Self {
        Self {
            connection,
            store,
            cost_model,
        }
    }

    /// Fetches the flags of `uids` and writes back every header in `headers`
    /// whose flags changed. `headers[i]` is the stored header of `uids[i]`.
    ///
    /// A failing batch changes nothing and reports no progress. Either way
    /// `reporter` is told the sub-sync is done.
    pub async fn run(
        &self,
        uids: &[Uid],
        mut headers: Vec<HeaderInfo>,
        reporter: Reporter,
    ) -> Reconciled {
        let request = FetchRequest::new(uids, FieldSpec::flags_only());
        let mut reconciled = Reconciled::default();
        match self.connection.fetch_metadata(&request).await {
            Ok(records) => {
                for (position, record) in records.into_iter().enumerate() {
                    let Some(index) = locate(position, record.uid(), uids, &headers) else {
                        warn!(
                            "server reports unexpected message {}, skipping",
                            record.uid()
                        );
                        reconciled.skipped += 1;
                        continue;
                    };
                    if self.reconcile(&mut headers[index], record).await {
                        reconciled.updated += 1;
                    } else {
                        reconciled.unchanged += 1;
                    }
                }
                info!(
                    "{} known messages changed, {} unchanged in {}",
                    reconciled.updated,
                    reconciled.unchanged,
                    self.store.folder_id()
                );
                // responses arrive in a burst, so progress is reported in one go
                reporter.progress(self.cost_model.known_batch_cost(uids.len()));
            }
            Err(error) => warn!("fetching known flags failed, ideally harmless: {error}"),
        }
        reporter.done();

        reconciled
    }

    /// Returns whether the header had to be written back.
    async fn reconcile(&self, header: &mut HeaderInfo, mut record: ServerRecord) -> bool {
        record.strip_recent();
        let flags = record.flags();

        let delta = unread_delta(&header.flags, flags);
        if delta != 0 {
            debug!("unread count of {} changes by {delta}", header.srvid);
            if let Err(error) = self.store.adjust_unread_count(delta).await {
                warn!("adjusting unread count failed: {error}");
            }
        }

        if header.flags == *flags {
            self.store.mark_header_unchanged(header).await;
            return false;
        }

        debug!("flags of {} changed: {} -> {flags}", header.srvid, header.flags);
        header.flags.clone_from(flags);
        if let Err(error) = self
            .store
            .update_header(header.date, header.id, false, header, None)
            .await
        {
            warn!("updating header {} failed: {error}", header.id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        chew::{HeaderNormalizer, ImapChewer},
        imap::mock_connection::{MockConnection, flag_record, new_message_record, uid, uids},
        repository::{FlagList, LocalId},
        store::{HeaderUpdate, MemoryStore, StoreEvent},
        sync::{PassEvent, SubSync},
    };

    fn header(id: u64, srvid: u32, flags: &[&str]) -> HeaderInfo {
        let mut header = assert_ok!(ImapChewer.normalize(
            &new_message_record(srvid, flags),
            "inbox",
            LocalId::new(id)
        ))
        .header;
        header.flags = FlagList::new(flags.iter().copied());
        header
    }

    async fn reconcile(
        headers: Vec<HeaderInfo>,
        records: Vec<ServerRecord>,
        unread_count: i64,
    ) -> (MemoryStore, Reconciled, Vec<PassEvent>) {
        let known_uids = headers.iter().map(|header| header.srvid).collect::<Vec<_>>();
        let connection =
            MockConnection::default().with_records(FieldSpec::flags_only(), records);
        let store = MemoryStore::new("inbox")
            .with_headers(headers.clone())
            .with_unread_count(unread_count);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let reconciled = KnownMessageReconciler::new(&connection, &store, CostModel::default())
            .run(&known_uids, headers, Reporter::new(tx, SubSync::Known))
            .await;
        assert_ok!(store.flush_deferred_operations().await);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (store, reconciled, events)
    }

    #[rstest]
    #[tokio::test]
    async fn test_reordered_flags_are_unchanged() {
        let (store, reconciled, _) = reconcile(
            vec![header(1, 10, &[r"\Seen", r"\Flagged"])],
            vec![flag_record(10, &[r"\Flagged", r"\Seen"])],
            0,
        )
        .await;

        assert_eq!(reconciled.unchanged, 1);
        assert_is_empty!(store.updates().await);
        assert_eq!(store.events().await, vec![StoreEvent::Unchanged(LocalId::new(1))]);
    }

    #[rstest]
    #[case::read_on_server(&[], &[r"\Seen"], -1)]
    #[case::unread_on_server(&[r"\Seen"], &[], 1)]
    #[case::never_read(&[], &[r"\Flagged"], 0)]
    #[case::still_read(&[r"\Seen"], &[r"\Seen", r"\Answered"], 0)]
    #[tokio::test]
    async fn test_seen_transitions_adjust_unread_count(
        #[case] cached: &[&str],
        #[case] incoming: &[&str],
        #[case] expected_delta: i64,
    ) {
        let (store, reconciled, _) = reconcile(
            vec![header(1, 10, cached)],
            vec![flag_record(10, incoming)],
            5,
        )
        .await;

        assert_eq!(store.unread_count().await, 5 + expected_delta);
        assert_eq!(reconciled.updated, 1);
        let stored = assert_some!(store.header(LocalId::new(1)).await);
        assert_eq!(stored.flags, FlagList::new(incoming.iter().copied()));
    }

    #[rstest]
    #[tokio::test]
    async fn test_changed_flags_update_outside_bulk_sync_without_body() {
        let cached = header(1, 10, &[]);
        let (store, _, _) = reconcile(
            vec![cached.clone()],
            vec![flag_record(10, &[r"\Answered"])],
            0,
        )
        .await;

        assert_eq!(
            store.updates().await,
            vec![HeaderUpdate {
                date: cached.date,
                id: LocalId::new(1),
                part_of_bulk_sync: false,
                with_body_hint: false,
            }]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_out_of_order_responses_match_by_uid() {
        let (store, reconciled, _) = reconcile(
            vec![header(1, 10, &[]), header(2, 11, &[])],
            vec![
                flag_record(11, &[r"\Flagged"]),
                flag_record(10, &[r"\Answered"]),
            ],
            0,
        )
        .await;

        assert_eq!(reconciled.updated, 2);
        let first = assert_some!(store.header(LocalId::new(1)).await);
        let second = assert_some!(store.header(LocalId::new(2)).await);
        assert_eq!(first.flags, FlagList::new([r"\Answered"]));
        assert_eq!(second.flags, FlagList::new([r"\Flagged"]));
    }

    #[rstest]
    #[tokio::test]
    async fn test_recent_is_ignored() {
        let (store, reconciled, _) = reconcile(
            vec![header(1, 10, &[r"\Seen"])],
            vec![flag_record(10, &[r"\Recent", r"\Seen"])],
            0,
        )
        .await;

        assert_eq!(reconciled.unchanged, 1);
        assert_is_empty!(store.updates().await);
    }

    #[rstest]
    fn test_unexpected_uid_is_not_located() {
        let headers = vec![header(1, 10, &[])];

        assert_none!(locate(0, uid(99), &uids([10]), &headers));
        assert_eq!(locate(0, uid(10), &uids([10]), &headers), Some(0));
    }

    #[rstest]
    #[tokio::test]
    async fn test_progress_is_reported_once_for_the_batch() {
        let (_, _, events) = reconcile(
            vec![header(1, 10, &[]), header(2, 11, &[])],
            vec![flag_record(10, &[]), flag_record(11, &[])],
            0,
        )
        .await;

        assert_eq!(
            events,
            vec![PassEvent::Progress(22), PassEvent::Done(SubSync::Known)]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_failed_batch_changes_nothing() {
        let connection = MockConnection::default().failing_on([10]);
        let store = MemoryStore::new("inbox").with_headers([header(1, 10, &[])]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let reconciled = KnownMessageReconciler::new(&connection, &store, CostModel::default())
            .run(
                &uids([10]),
                vec![header(1, 10, &[])],
                Reporter::new(tx, SubSync::Known),
            )
            .await;

        assert_eq!(reconciled, Reconciled::default());
        assert_eq!(assert_ok!(rx.try_recv()), PassEvent::Done(SubSync::Known));
        assert_err!(rx.try_recv());
        assert_is_empty!(store.pending_events().await);
    }
}
