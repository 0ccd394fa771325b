use std::fmt::Display;

use log::trace;
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubSync {
    New,
    Known,
}

impl Display for SubSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubSync::New => write!(f, "new messages"),
            SubSync::Known => write!(f, "known messages"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassEvent {
    Progress(u64),
    Done(SubSync),
}

/// Handle a sub-sync uses to talk to the coordinating future.
#[derive(Debug)]
pub struct Reporter {
    tx: mpsc::UnboundedSender<PassEvent>,
    sub_sync: SubSync,
}

impl Reporter {
    pub fn new(tx: mpsc::UnboundedSender<PassEvent>, sub_sync: SubSync) -> Self {
        Self { tx, sub_sync }
    }

    pub fn progress(&self, cost: u64) {
        self.send(PassEvent::Progress(cost));
    }

    /// Signals that the sub-sync finished. Takes the reporter so there is
    /// exactly one such signal.
    pub fn done(self) {
        trace!("{} done", self.sub_sync);
        self.send(PassEvent::Done(self.sub_sync));
    }

    fn send(&self, event: PassEvent) {
        if self.tx.send(event).is_err() {
            trace!("pass stopped listening, dropping {event:?}");
        }
    }
}
