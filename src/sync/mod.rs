mod cost;
mod event;
mod known_messages;
mod new_messages;
mod pass;
mod plan;
mod state;

pub use cost::CostModel;
pub use cost::ProgressTracker;
pub use event::PassEvent;
pub use event::Reporter;
pub use event::SubSync;
pub use known_messages::KnownMessageReconciler;
pub use known_messages::Reconciled;
pub use new_messages::NewMessageFetcher;
pub use pass::DEFAULT_STARTING_PROGRESS;
pub use pass::PassInput;
pub use pass::PassInputBuilder;
pub use pass::PassInputBuilderError;
pub use pass::SyncPass;
pub use pass::SyncSummary;
pub use plan::SyncPlan;
pub use state::InvalidTransition;
pub use state::PassState;
pub use state::Trigger;
