use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Store issued primary key of a message header.
///
/// Differs from the server [`Uid`](super::Uid) so that local operations can
/// refer to messages the server has not assigned an identifier to yet.
#[derive(
    Debug, PartialEq, Clone, Copy, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct LocalId(u64);

impl LocalId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for LocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<LocalId> for u64 {
    fn from(value: LocalId) -> Self {
        value.0
    }
}

impl TryFrom<i64> for LocalId {
    type Error = &'static str;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| "local id should not be negative")
    }
}

impl TryFrom<LocalId> for i64 {
    type Error = &'static str;

    fn try_from(value: LocalId) -> Result<Self, Self::Error> {
        i64::try_from(value.0).map_err(|_| "local id does not fit into i64")
    }
}
