//! Bag metadata catalog.
//!
//! The catalog describes a whole bag (time bounds, segments, per-topic
//! counts, size, compression) so readers never have to scan segment bodies.
//!
//! ## Invariants
//!
//! - `message_count` equals the sum of `per_topic_counts[*].message_count`
//!   once the catalog is finalized
//! - `starting_time` only ever moves earlier
//! - `duration` only ever grows and spans the earliest to the latest message
//! - `relative_segment_paths` holds one entry per segment ever closed or
//!   currently open
//! - the catalog is empty exactly when `message_count` is zero; the value of
//!   `starting_time` never decides it

use crate::config::CompressionMode;
use crate::registry::TopicRegistry;
use crate::types::{Timestamp, TopicInformation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Current catalog format version.
pub const METADATA_VERSION: u32 = 1;

/// The metadata catalog of a bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "CatalogFile", from = "CatalogFile")]
pub struct BagMetadata {
    /// Catalog format version.
    pub version: u32,
    /// Storage backend that wrote the segments.
    pub storage_identifier: String,
    /// Segment files relative to the bag directory, in write order.
    pub relative_segment_paths: Vec<String>,
    /// Time of the earliest message, [`Timestamp::UNSET`] if there is none.
    pub starting_time: Timestamp,
    /// Span between the earliest and the latest message.
    pub duration: Duration,
    /// Total number of messages.
    pub message_count: u64,
    /// Topics keyed by name with their message counts.
    pub per_topic_counts: BTreeMap<String, TopicInformation>,
    /// Sum of the sizes of every segment file.
    pub total_size_bytes: u64,
    /// Compressor identifier, empty when compression is disabled.
    pub compression_format: String,
    /// One of `NONE`, `FILE` or `MESSAGE`.
    pub compression_mode: String,
}

impl BagMetadata {
    /// Creates an empty catalog for segments written by `storage_identifier`.
    #[must_use]
    pub fn new(storage_identifier: impl Into<String>) -> Self {
        Self {
            version: METADATA_VERSION,
            storage_identifier: storage_identifier.into(),
            relative_segment_paths: Vec::new(),
            starting_time: Timestamp::UNSET,
            duration: Duration::ZERO,
            message_count: 0,
            per_topic_counts: BTreeMap::new(),
            total_size_bytes: 0,
            compression_format: String::new(),
            compression_mode: CompressionMode::None.as_str().to_string(),
        }
    }

    /// Returns the time of the earliest message, or `None` if the bag holds
    /// no message.
    #[must_use]
    pub fn first_message_time(&self) -> Option<Timestamp> {
        (self.message_count > 0).then_some(self.starting_time)
    }

    /// Returns the time of the latest message, or `None` if the bag holds
    /// no message.
    #[must_use]
    pub fn last_message_time(&self) -> Option<Timestamp> {
        let start = self.first_message_time()?;
        let span = i128::try_from(self.duration.as_nanos()).unwrap_or(i128::MAX);
        let end = i128::from(start.as_nanos()).saturating_add(span);
        Some(Timestamp::from_nanos(i64::try_from(end).unwrap_or(i64::MAX)))
    }

    /// Accounts for one message with the given timestamp.
    ///
    /// Timestamps may arrive in any order; the catalog keeps the earliest
    /// one as `starting_time` and the full span as `duration`.
    pub fn record_message(&mut self, timestamp: i64) {
        let time = Timestamp::from_nanos(timestamp);
        let (start, end) = match (self.first_message_time(), self.last_message_time()) {
            (Some(start), Some(end)) => (start.min(time), end.max(time)),
            _ => (time, time),
        };

        self.message_count += 1;
        self.starting_time = start;
        self.duration = span(start, end).max(self.duration);
    }

    /// Appends a segment as soon as it is opened.
    pub fn push_segment(&mut self, relative_path: impl Into<String>) {
        self.relative_segment_paths.push(relative_path.into());
    }

    /// Replaces the most recent entry equal to `old` with `new`.
    ///
    /// Returns false if `old` is not listed.
    pub fn replace_segment(&mut self, old: &str, new: impl Into<String>) -> bool {
        match self.relative_segment_paths.iter_mut().rev().find(|path| *path == old) {
            Some(entry) => {
                *entry = new.into();
                true
            }
            None => false,
        }
    }

    /// Seals the catalog by recomputing the derived fields.
    ///
    /// Message counts are taken from `topics`, the size from the caller's
    /// measurement of every segment file.
    pub fn finalize(
        &mut self,
        topics: &TopicRegistry,
        total_size_bytes: u64,
        compression_format: &str,
        compression_mode: CompressionMode,
    ) {
        self.per_topic_counts = topics.snapshot();
        self.message_count = topics.total_messages();
        self.total_size_bytes = total_size_bytes;
        self.compression_format = compression_format.to_string();
        self.compression_mode = compression_mode.as_str().to_string();
    }

    /// Merges the locally tracked catalog of a freshly closed segment.
    ///
    /// - storage identifier and segment list are replaced by the incoming ones
    /// - message counts and durations add up
    /// - starting time is lowered only by an earlier, set, non-zero value
    /// - total size is replaced
    /// - topics merge by name and the first entry wins on duplicates
    pub fn merge(&mut self, incoming: &BagMetadata) {
        self.storage_identifier = incoming.storage_identifier.clone();
        self.relative_segment_paths = incoming.relative_segment_paths.clone();
        self.message_count += incoming.message_count;

        if let Some(candidate) = incoming.first_message_time() {
            if candidate.as_nanos() != 0 && candidate < self.starting_time {
                self.starting_time = candidate;
            }
        }

        self.duration = self.duration.saturating_add(incoming.duration);
        self.total_size_bytes = incoming.total_size_bytes;

        for (name, info) in &incoming.per_topic_counts {
            self.per_topic_counts
                .entry(name.clone())
                .or_insert_with(|| info.clone());
        }
    }
}

fn span(start: Timestamp, end: Timestamp) -> Duration {
    Duration::from_nanos(end.as_nanos().abs_diff(start.as_nanos()))
}

/// On-disk shape of the catalog.
///
/// `starting_time` is `null` while the catalog still holds its initial empty
/// state and `duration` is whole nanoseconds.
#[derive(Serialize, Deserialize)]
struct CatalogFile {
    version: u32,
    storage_identifier: String,
    relative_segment_paths: Vec<String>,
    starting_time: Option<i64>,
    duration: u64,
    message_count: u64,
    per_topic_counts: BTreeMap<String, TopicInformation>,
    total_size_bytes: u64,
    compression_format: String,
    compression_mode: String,
}

impl From<BagMetadata> for CatalogFile {
    fn from(metadata: BagMetadata) -> Self {
        Self {
            starting_time: (metadata.message_count > 0
                || metadata.starting_time != Timestamp::UNSET)
                .then_some(metadata.starting_time.as_nanos()),
            duration: u64::try_from(metadata.duration.as_nanos()).unwrap_or(u64::MAX),
            version: metadata.version,
            storage_identifier: metadata.storage_identifier,
            relative_segment_paths: metadata.relative_segment_paths,
            message_count: metadata.message_count,
            per_topic_counts: metadata.per_topic_counts,
            total_size_bytes: metadata.total_size_bytes,
            compression_format: metadata.compression_format,
            compression_mode: metadata.compression_mode,
        }
    }
}

impl From<CatalogFile> for BagMetadata {
    fn from(file: CatalogFile) -> Self {
        Self {
            version: file.version,
            storage_identifier: file.storage_identifier,
            relative_segment_paths: file.relative_segment_paths,
            starting_time: file
                .starting_time
                .map_or(Timestamp::UNSET, Timestamp::from_nanos),
            duration: Duration::from_nanos(file.duration),
            message_count: file.message_count,
            per_topic_counts: file.per_topic_counts,
            total_size_bytes: file.total_size_bytes,
            compression_format: file.compression_format,
            compression_mode: file.compression_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use segbag_storage::TopicMetadata;

    fn info(name: &str, count: u64) -> TopicInformation {
        TopicInformation {
            metadata: TopicMetadata::new(name, "t", "cdr"),
            message_count: count,
        }
    }

    #[test]
    fn new_catalog_has_no_messages() {
        let metadata = BagMetadata::new("segfile");
        assert_eq!(metadata.starting_time, Timestamp::UNSET);
        assert_eq!(metadata.first_message_time(), None);
        assert_eq!(metadata.message_count, 0);
        assert_eq!(metadata.compression_mode, "NONE");
    }

    #[test]
    fn out_of_order_timestamps() {
        let mut metadata = BagMetadata::new("segfile");
        for ts in [10, 20, 5] {
            metadata.record_message(ts);
        }

        assert_eq!(metadata.first_message_time(), Some(Timestamp::from_nanos(5)));
        assert_eq!(metadata.duration, Duration::from_nanos(15));
        assert_eq!(metadata.last_message_time(), Some(Timestamp::from_nanos(20)));
        assert_eq!(metadata.message_count, 3);
    }

    #[test]
    fn largest_timestamp_is_a_real_message() {
        let mut metadata = BagMetadata::new("segfile");
        metadata.record_message(i64::MAX);

        assert_eq!(metadata.message_count, 1);
        assert_eq!(metadata.first_message_time(), Some(Timestamp::from_nanos(i64::MAX)));
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["starting_time"], i64::MAX);

        metadata.record_message(5);

        assert_eq!(metadata.first_message_time(), Some(Timestamp::from_nanos(5)));
        assert_eq!(metadata.duration, Duration::from_nanos(i64::MAX.abs_diff(5)));
        assert_eq!(metadata.last_message_time(), Some(Timestamp::from_nanos(i64::MAX)));
    }

    #[test]
    fn full_range_span() {
        let mut metadata = BagMetadata::new("segfile");
        metadata.record_message(i64::MIN);
        metadata.record_message(i64::MAX);

        assert_eq!(metadata.duration, Duration::from_nanos(u64::MAX));
        assert_eq!(metadata.last_message_time(), Some(Timestamp::from_nanos(i64::MAX)));

        let json = serde_json::to_string(&metadata).unwrap();
        let parsed: BagMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn finalize_recomputes_from_registry() {
        let mut registry = TopicRegistry::new();
        registry.register(&TopicMetadata::new("/a", "t", "cdr"));
        registry.record_message("/a");
        registry.record_message("/a");

        let mut metadata = BagMetadata::new("segfile");
        metadata.message_count = 99;
        metadata.finalize(&registry, 1234, "zstd", CompressionMode::File);

        assert_eq!(metadata.message_count, 2);
        assert_eq!(metadata.per_topic_counts["/a"].message_count, 2);
        assert_eq!(metadata.total_size_bytes, 1234);
        assert_eq!(metadata.compression_format, "zstd");
        assert_eq!(metadata.compression_mode, "FILE");
    }

    #[test]
    fn replace_segment_swaps_latest_match() {
        let mut metadata = BagMetadata::new("segfile");
        metadata.push_segment("run.seg");
        metadata.push_segment("run_1.seg");

        assert!(metadata.replace_segment("run.seg", "run.seg.zstd"));
        assert!(!metadata.replace_segment("run_9.seg", "x"));
        assert_eq!(metadata.relative_segment_paths, ["run.seg.zstd", "run_1.seg"]);
    }

    #[test]
    fn merge_first_writer_wins() {
        let mut metadata = BagMetadata::new("segfile");
        metadata.starting_time = Timestamp::from_nanos(100);
        metadata.duration = Duration::from_nanos(10);
        metadata.message_count = 3;
        metadata.per_topic_counts.insert("/a".into(), info("/a", 3));
        metadata.push_segment("bag.seg");

        let mut incoming = BagMetadata::new("other");
        incoming.starting_time = Timestamp::from_nanos(50);
        incoming.duration = Duration::from_nanos(7);
        incoming.message_count = 4;
        incoming.total_size_bytes = 4096;
        incoming.relative_segment_paths = vec!["bag.seg".into(), "bag_1.seg".into()];
        incoming.per_topic_counts.insert("/a".into(), info("/a", 10));
        incoming.per_topic_counts.insert("/b".into(), info("/b", 1));

        metadata.merge(&incoming);

        assert_eq!(metadata.storage_identifier, "other");
        assert_eq!(metadata.relative_segment_paths.len(), 2);
        assert_eq!(metadata.message_count, 7);
        assert_eq!(metadata.starting_time, Timestamp::from_nanos(50));
        assert_eq!(metadata.duration, Duration::from_nanos(17));
        assert_eq!(metadata.total_size_bytes, 4096);
        assert_eq!(metadata.per_topic_counts["/a"].message_count, 3);
        assert_eq!(metadata.per_topic_counts["/b"].message_count, 1);
    }

    #[test]
    fn merge_ignores_sentinel_start_times() {
        let mut metadata = BagMetadata::new("segfile");
        metadata.starting_time = Timestamp::from_nanos(100);

        let mut zero = BagMetadata::new("segfile");
        zero.starting_time = Timestamp::from_nanos(0);
        metadata.merge(&zero);
        metadata.merge(&BagMetadata::new("segfile"));

        assert_eq!(metadata.starting_time, Timestamp::from_nanos(100));
    }

    #[test]
    fn persisted_field_names() {
        let mut metadata = BagMetadata::new("segfile");
        metadata.push_segment("bag.seg");
        let json = serde_json::to_value(&metadata).unwrap();

        for field in [
            "version",
            "storage_identifier",
            "relative_segment_paths",
            "starting_time",
            "duration",
            "message_count",
            "per_topic_counts",
            "total_size_bytes",
            "compression_format",
            "compression_mode",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert!(json["starting_time"].is_null());

        let parsed: BagMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, metadata);
    }

    proptest! {
        #[test]
        fn bounds_match_min_and_max(timestamps in prop::collection::vec(any::<i64>(), 1..64)) {
            let mut metadata = BagMetadata::new("segfile");
            for &ts in &timestamps {
                metadata.record_message(ts);
            }

            let min = *timestamps.iter().min().unwrap();
            let max = *timestamps.iter().max().unwrap();
            prop_assert_eq!(metadata.starting_time, Timestamp::from_nanos(min));
            prop_assert_eq!(metadata.duration, Duration::from_nanos(max.abs_diff(min)));
            prop_assert_eq!(metadata.message_count, timestamps.len() as u64);
            prop_assert_eq!(metadata.last_message_time(), Some(Timestamp::from_nanos(max)));
        }
    }
}
