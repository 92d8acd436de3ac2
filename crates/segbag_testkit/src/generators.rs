//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random recording sessions.

use segbag_core::CompressionMode;
use proptest::prelude::*;

/// One write of a generated session.
#[derive(Debug, Clone)]
pub struct WriteOp {
    /// Index into the session's topic list.
    pub topic: usize,
    /// Payload size in bytes.
    pub payload_size: usize,
    /// Record timestamp in nanoseconds.
    pub timestamp: i64,
}

/// A generated recording session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Topic names, all distinct.
    pub topics: Vec<String>,
    /// Writes in order.
    pub writes: Vec<WriteOp>,
}

impl Session {
    /// Returns how many writes target each topic.
    pub fn counts(&self) -> Vec<u64> {
        let mut counts = vec![0u64; self.topics.len()];
        for write in &self.writes {
            counts[write.topic] += 1;
        }
        counts
    }
}

/// Strategy for generating valid topic names.
pub fn topic_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("/[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating timestamps, in any order.
pub fn timestamp_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![
        8 => -1_000_000_000_000i64..1_000_000_000_000i64,
        1 => Just(i64::MAX),
        1 => Just(i64::MIN),
    ]
}

/// Strategy for generating compression modes.
pub fn compression_mode_strategy() -> impl Strategy<Value = CompressionMode> {
    prop_oneof![
        Just(CompressionMode::None),
        Just(CompressionMode::File),
        Just(CompressionMode::Message),
    ]
}

/// Strategy for generating sessions over 1 to 4 topics.
pub fn session_strategy(max_writes: usize) -> impl Strategy<Value = Session> {
    prop::collection::btree_set(topic_name_strategy(), 1..=4).prop_flat_map(move |names| {
        let topics: Vec<String> = names.into_iter().collect();
        let writes = prop::collection::vec(
            (0..topics.len(), 0usize..512, timestamp_strategy()).prop_map(
                |(topic, payload_size, timestamp)| WriteOp {
                    topic,
                    payload_size,
                    timestamp,
                },
            ),
            0..=max_writes,
        );
        (Just(topics), writes).prop_map(|(topics, writes)| Session { topics, writes })
    })
}
