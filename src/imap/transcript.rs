use std::{collections::HashMap, path::Path};

use futures::StreamExt;
use log::{debug, info, trace, warn};
use tokio::{fs::File, io::AsyncRead, task};
use tokio_util::codec::FramedRead;

use crate::{
    imap::{
        Completion, FetchError, FetchMetadata, FetchRequest, ResponseCodec, ResponseFrame,
        ServerRecord,
    },
    repository::Uid,
};

#[derive(Debug, Clone)]
enum RecordedFailure {
    Rejected {
        status: Completion,
        information: Option<String>,
    },
    Disconnected(Option<String>),
}

impl From<&RecordedFailure> for FetchError {
    fn from(value: &RecordedFailure) -> Self {
        match value {
            RecordedFailure::Rejected {
                status,
                information,
            } => FetchError::Rejected {
                status: *status,
                information: information.clone(),
            },
            RecordedFailure::Disconnected(information) => {
                FetchError::Disconnected(information.clone())
            }
        }
    }
}

/// Replays server output captured from an earlier session.
///
/// Every FETCH response in the transcript is held in memory and served to any
/// request naming its UID. Responses for a UID seen before are merged into
/// its first record, so each message is answered once. A tagged NO/BAD or an
/// untagged BYE in the transcript makes every request fail the same way.
#[derive(Debug, Default)]
pub struct TranscriptConnection {
    records: Vec<ServerRecord>,
    failure: Option<RecordedFailure>,
}

impl TranscriptConnection {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FetchError> {
        let path = path.as_ref();
        debug!("loading transcript from {}", path.display());
        let file = File::open(path).await?;
        Self::from_reader(file).await
    }

    pub async fn from_reader<R: AsyncRead + Unpin>(reader: R) -> Result<Self, FetchError> {
        let mut frames = FramedRead::new(reader, ResponseCodec);
        let mut connection = TranscriptConnection::default();
        let mut positions = HashMap::<Uid, usize>::new();
        while let Some(frame) = frames.next().await {
            match frame? {
                ResponseFrame::Fetch(record) => match positions.get(&record.uid()) {
                    Some(&position) => {
                        trace!("merging repeated FETCH for uid {}", record.uid());
                        connection.records[position].merge(record);
                    }
                    None => {
                        positions.insert(record.uid(), connection.records.len());
                        connection.records.push(record);
                    }
                },
                ResponseFrame::Completed {
                    status: Completion::Ok,
                    tag,
                    ..
                } => trace!("transcript command {tag} completed"),
                ResponseFrame::Completed {
                    status,
                    information,
                    tag,
                } => {
                    warn!("transcript command {tag} failed with {status}");
                    connection.failure = Some(RecordedFailure::Rejected {
                        status,
                        information,
                    });
                }
                ResponseFrame::Bye(information) => {
                    warn!("transcript ends with BYE");
                    connection.failure = Some(RecordedFailure::Disconnected(information));
                }
                ResponseFrame::Other => {}
            }
        }
        info!(
            "transcript holds {} fetch responses",
            connection.records.len()
        );

        Ok(connection)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FetchMetadata for TranscriptConnection {
    async fn fetch_metadata(
        &self,
        request: &FetchRequest<'_>,
    ) -> Result<Vec<ServerRecord>, FetchError> {
        debug!("{request}");
        // a real server answers asynchronously; let other outstanding requests run first
        task::yield_now().await;

        if let Some(failure) = &self.failure {
            return Err(failure.into());
        }

        let records = self
            .records
            .iter()
            .filter(|record| request.uids().contains(&record.uid()))
            .map(|record| {
                let mut record = record.clone();
                record.restrict_to(request.fields());
                record
            })
            .collect::<Vec<_>>();
        trace!("answering with {} records", records.len());

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assertables::*;
    use rstest::*;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::{
        imap::FieldSpec,
        repository::{FlagList, Uid},
    };

    fn uid(num: u32) -> Uid {
        assert_ok!(Uid::try_from(num))
    }

    #[fixture]
    fn transcript() -> String {
        let header = "Subject: hello\r\n\r\n";
        format!(
            "* 1 FETCH (UID 7 FLAGS (\\Seen))\r\n\
             * 2 FETCH (UID 8 FLAGS (\\Recent) INTERNALDATE \"01-Jan-2020 10:00:00 +0000\" \
             BODY[HEADER.FIELDS (SUBJECT)] {{{}}}\r\n{header})\r\n\
             * 3 FETCH (UID 9 FLAGS ())\r\n\
             A1 OK FETCH completed\r\n",
            header.len()
        )
    }

    #[rstest]
    #[tokio::test]
    async fn test_answers_only_requested_uids_in_transcript_order(transcript: String) {
        let connection = assert_ok!(TranscriptConnection::from_reader(transcript.as_bytes()).await);
        assert_eq!(connection.len(), 3);

        let uids = [uid(9), uid(7), uid(100)];
        let records = assert_ok!(
            connection
                .fetch_metadata(&FetchRequest::new(&uids, FieldSpec::flags_only()))
                .await
        );

        let answered = records.iter().map(ServerRecord::uid).collect::<Vec<_>>();
        assert_eq!(answered, vec![uid(7), uid(9)]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_flags_only_request_drops_header_data(transcript: String) {
        let connection = assert_ok!(TranscriptConnection::from_reader(transcript.as_bytes()).await);

        let uids = [uid(8)];
        let records = assert_ok!(
            connection
                .fetch_metadata(&FetchRequest::new(&uids, FieldSpec::flags_only()))
                .await
        );

        assert_len_eq_x!(&records, 1);
        assert_none!(records[0].internal_date().as_ref());
        assert_none!(records[0].header_fields().as_ref());
        assert_eq!(records[0].flags(), &FlagList::new([r"\Recent"]));
    }

    #[rstest]
    #[tokio::test]
    async fn test_repeated_fetch_of_a_uid_is_answered_once() {
        let header = "Subject: hello\r\n\r\n";
        let raw = format!(
            "* 2 FETCH (UID 8 FLAGS () INTERNALDATE \"01-Jan-2020 10:00:00 +0000\" \
             BODY[HEADER.FIELDS (SUBJECT)] {{{}}}\r\n{header})\r\n\
             * 2 FETCH (UID 8 FLAGS (\\Seen))\r\n\
             A1 OK FETCH completed\r\n",
            header.len()
        );
        let connection = assert_ok!(TranscriptConnection::from_reader(raw.as_bytes()).await);
        assert_eq!(connection.len(), 1);

        let uids = [uid(8)];
        let flags = assert_ok!(
            connection
                .fetch_metadata(&FetchRequest::new(&uids, FieldSpec::flags_only()))
                .await
        );
        let full = assert_ok!(
            connection
                .fetch_metadata(&FetchRequest::new(&uids, FieldSpec::new_messages()))
                .await
        );

        assert_len_eq_x!(&flags, 1);
        assert_eq!(flags[0].flags(), &FlagList::new([r"\Seen"]));
        assert_len_eq_x!(&full, 1);
        assert_some!(full[0].internal_date().as_ref());
        assert_some!(full[0].header_fields().as_ref());
    }

    #[rstest]
    #[tokio::test]
    async fn test_recorded_rejection_fails_every_request() {
        let raw = "* 1 FETCH (UID 7 FLAGS ())\r\nA1 NO mailbox gone\r\n";
        let connection = assert_ok!(TranscriptConnection::from_reader(raw.as_bytes()).await);

        let uids = [uid(7)];
        let result = connection
            .fetch_metadata(&FetchRequest::new(&uids, FieldSpec::flags_only()))
            .await;

        assert_matches!(
            result,
            Err(FetchError::Rejected {
                status: Completion::No,
                ..
            })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_recorded_bye_is_disconnect() {
        let raw = "* BYE idle too long\r\n";
        let connection = assert_ok!(TranscriptConnection::from_reader(raw.as_bytes()).await);
        assert!(connection.is_empty());

        let uids = [uid(1)];
        let result = connection
            .fetch_metadata(&FetchRequest::new(&uids, FieldSpec::new_messages()))
            .await;

        assert_matches!(result, Err(FetchError::Disconnected(Some(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_load_reads_file(transcript: String) {
        let mut file = assert_ok!(NamedTempFile::new());
        assert_ok!(file.write_all(transcript.as_bytes()));

        let connection = assert_ok!(TranscriptConnection::load(file.path()).await);

        assert_eq!(connection.len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let dir = assert_ok!(tempfile::tempdir());

        let result = TranscriptConnection::load(dir.path().join("missing")).await;

        assert_matches!(result, Err(FetchError::Io(_)));
    }
}
