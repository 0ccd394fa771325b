use derive_getters::Getters;
use serde::Deserialize;

pub const KNOWN_BATCH_COST: u64 = 20;
pub const KNOWN_ITEM_COST: u64 = 1;
pub const NEW_BATCH_COST: u64 = 20;
pub const NEW_ITEM_COST: u64 = 5;
/// Body downloads happen after the header pass and are not part of its total.
pub const NEW_BODY_COST: u64 = 30;

/// Weights used to turn message counts into progress.
///
/// Costs are abstract units for the progress bar, nothing is measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Getters)]
#[serde(default)]
pub struct CostModel {
    known_batch: u64,
    known_item: u64,
    new_batch: u64,
    new_item: u64,
    new_body: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            known_batch: KNOWN_BATCH_COST,
            known_item: KNOWN_ITEM_COST,
            new_batch: NEW_BATCH_COST,
            new_item: NEW_ITEM_COST,
            new_body: NEW_BODY_COST,
        }
    }
}

fn batch_cost(batch: u64, item: u64, count: usize) -> u64 {
    if count == 0 {
        0
    } else {
        batch + item * count as u64
    }
}

impl CostModel {
    pub fn known_batch_cost(&self, count: usize) -> u64 {
        batch_cost(self.known_batch, self.known_item, count)
    }

    pub fn new_batch_cost(&self, count: usize) -> u64 {
        batch_cost(self.new_batch, self.new_item, count)
    }

    pub fn total(&self, new: usize, known: usize) -> u64 {
        self.new_batch_cost(new) + self.known_batch_cost(known)
    }
}

/// Running progress of one pass, mapped into `[start, 1]`.
#[derive(Debug)]
pub struct ProgressTracker {
    start: f64,
    total: u64,
    consumed: u64,
}

impl ProgressTracker {
    pub fn new(start: f64, total: u64) -> Self {
        Self {
            start,
            total,
            consumed: 0,
        }
    }

    /// Adds `cost` and returns the resulting fraction. Without any cost to
    /// spend there is no progress to report.
    #[expect(clippy::cast_precision_loss)]
    pub fn consume(&mut self, cost: u64) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        self.consumed += cost;
        let done = self.consumed as f64 / self.total as f64;
        Some(self.start + (1.0 - self.start) * done)
    }
}
