//! Core type definitions for the bag catalog.

use segbag_storage::TopicMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time in nanoseconds since the epoch.
///
/// [`Timestamp::UNSET`] is the largest representable value and only seeds
/// an empty catalog. `i64::MAX` is still a valid message time, so emptiness
/// is decided by a message count, never by comparing against the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Starting time of a catalog that has recorded no message.
    pub const UNSET: Self = Self(i64::MAX);

    /// Creates a timestamp from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Returns the raw nanosecond value.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// A topic together with the number of messages recorded on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInformation {
    /// The topic.
    pub metadata: TopicMetadata,
    /// Messages written on the topic since it was created.
    pub message_count: u64,
}

impl TopicInformation {
    /// Creates an entry with no messages.
    #[must_use]
    pub fn new(metadata: TopicMetadata) -> Self {
        Self {
            metadata,
            message_count: 0,
        }
    }
}
