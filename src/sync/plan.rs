use std::collections::HashMap;

use derive_getters::Getters;

use crate::{
    repository::Uid,
    store::HeaderInfo,
    sync::{PassInput, PassInputBuilder, PassInputBuilderError},
};

/// Split of a requested uid set into messages to fetch and messages to
/// reconcile.
#[derive(Debug, Default, Getters)]
pub struct SyncPlan {
    new_uids: Vec<Uid>,
    known_uids: Vec<Uid>,
    known_headers: Vec<HeaderInfo>,
}

impl SyncPlan {
    /// Every uid with a stored header is known, all others are new. Both
    /// halves keep the order of `uids`.
    pub fn partition(uids: &[Uid], stored: Vec<HeaderInfo>) -> Self {
        let mut stored = stored
            .into_iter()
            .map(|header| (header.srvid, header))
            .collect::<HashMap<_, _>>();
        let mut plan = Self::default();
        for uid in uids {
            match stored.remove(uid) {
                Some(header) => {
                    plan.known_uids.push(*uid);
                    plan.known_headers.push(header);
                }
                None => plan.new_uids.push(*uid),
            }
        }
        plan
    }

    pub fn into_input(self, starting_progress: f64) -> Result<PassInput, PassInputBuilderError> {
        PassInputBuilder::default()
            .new_uids(self.new_uids)
            .known_uids(self.known_uids)
            .known_headers(self.known_headers)
            .starting_progress(starting_progress)
            .build()
    }
}
