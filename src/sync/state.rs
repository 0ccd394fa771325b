use thiserror::Error;

/// Where a sync pass stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassState {
    Idle,
    FetchingNew,
    FetchingKnown,
    BothFetching,
    Flushing,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Sub-syncs were started, the flags tell which ones.
    Dispatched { new: bool, known: bool },
    NewDone,
    KnownDone,
    FlushComplete,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{trigger:?} is not expected while {state:?}")]
pub struct InvalidTransition {
    pub state: PassState,
    pub trigger: Trigger,
}

impl PassState {
    pub fn on(self, trigger: Trigger) -> Result<Self, InvalidTransition> {
        let next = match (self, trigger) {
            (PassState::Idle, Trigger::Dispatched { new, known }) => match (new, known) {
                (true, true) => PassState::BothFetching,
                (true, false) => PassState::FetchingNew,
                (false, true) => PassState::FetchingKnown,
                (false, false) => PassState::Flushing,
            },
            (PassState::BothFetching, Trigger::NewDone) => PassState::FetchingKnown,
            (PassState::BothFetching, Trigger::KnownDone) => PassState::FetchingNew,
            (PassState::FetchingNew, Trigger::NewDone)
            | (PassState::FetchingKnown, Trigger::KnownDone) => PassState::Flushing,
            (PassState::Flushing, Trigger::FlushComplete) => PassState::Done,
            (state, trigger) => return Err(InvalidTransition { state, trigger }),
        };

        Ok(next)
    }

    /// Still waiting for at least one sub-sync.
    pub fn is_fetching(self) -> bool {
        matches!(
            self,
            PassState::FetchingNew | PassState::FetchingKnown | PassState::BothFetching
        )
    }
}
