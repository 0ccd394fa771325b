mod flag;
mod local_id;
mod sequence_set;
mod uid;

pub use flag::Flag;
pub use flag::FlagList;
pub use flag::unread_delta;
pub use local_id::LocalId;
pub use sequence_set::SequenceSet;
pub use sequence_set::SequenceSetBuilder;
pub use sequence_set::SequenceSetError;
pub use uid::Uid;
