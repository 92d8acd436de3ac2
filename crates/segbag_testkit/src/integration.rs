//! Cross-crate integration test helpers.
//!
//! Drives a writer through whole recording sessions and checks the
//! resulting bag against what was written.

use crate::fixtures::{record, topic, TestBag};
use crate::generators::Session;
use segbag_core::{BagMetadata, WriterResult};
use segbag_storage::{read_segment, Frame};
use std::collections::BTreeMap;
use std::path::Path;

/// Registers every topic of `session`, performs its writes and closes the
/// bag, returning the persisted catalog.
pub fn record_session(bag: &mut TestBag, session: &Session) -> WriterResult<BagMetadata> {
    for name in &session.topics {
        bag.writer.create_topic(&topic(name))?;
    }
    for write in &session.writes {
        let name = &session.topics[write.topic];
        bag.writer
            .write(record(name, write.payload_size, write.timestamp))?;
    }
    Ok(bag
        .writer
        .close()?
        .expect("writer was open, close must return a catalog"))
}

/// Checks the invariants every sealed catalog must hold.
pub fn assert_catalog_consistent(metadata: &BagMetadata) {
    let per_topic: u64 = metadata
        .per_topic_counts
        .values()
        .map(|info| info.message_count)
        .sum();
    assert_eq!(
        metadata.message_count, per_topic,
        "message_count must equal the sum of per-topic counts"
    );
    assert!(
        !metadata.relative_segment_paths.is_empty(),
        "a closed bag has at least one segment"
    );
    assert_eq!(
        metadata.first_message_time().is_some(),
        metadata.message_count > 0,
        "starting_time is set exactly when messages were recorded"
    );
}

/// Counts the messages per topic stored in an uncompressed segment file.
pub fn count_segment_messages(path: &Path) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for frame in read_segment(path).expect("Failed to read segment") {
        if let Frame::Message(record) = frame {
            *counts.entry(record.topic_name).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::*;
    use crate::fixtures::*;
    use crate::generators::*;
    use proptest::prelude::*;
    use segbag_core::{
        CompressionMode, CompressionOptions, ConverterOptions, Decompressor, ErrorKind,
        JsonMetadataIo, MetadataIo, StorageOptions, Writer, WriterError, WriterEvent,
        ZstdDecompressor, METADATA_FILENAME,
    };
    use segbag_storage::{FileStorageFactory, MemoryStorageFactory, FILE_STORAGE_ID};
    use std::sync::Arc;

    const KIB: u64 = 1024;

    fn no_compression() -> CompressionOptions {
        CompressionOptions::default()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn per_topic_counts_survive_rotation(session in session_strategy(64)) {
            let mut bag = TestBag::memory();
            bag.open_split(2 * KIB, &no_compression()).unwrap();

            let metadata = record_session(&mut bag, &session).unwrap();

            assert_catalog_consistent(&metadata);
            for (name, expected) in session.topics.iter().zip(session.counts()) {
                prop_assert_eq!(metadata.per_topic_counts[name].message_count, expected);
            }
            prop_assert_eq!(
                metadata.relative_segment_paths.len() as u64,
                bag.writer.stats().rotations() + 1
            );
        }

        #[test]
        fn time_bounds_cover_every_write(session in session_strategy(32)) {
            let mut bag = TestBag::memory();
            bag.open_default().unwrap();

            let metadata = record_session(&mut bag, &session).unwrap();

            let timestamps: Vec<i64> = session.writes.iter().map(|w| w.timestamp).collect();
            match (timestamps.iter().min(), timestamps.iter().max()) {
                (Some(&min), Some(&max)) => {
                    prop_assert_eq!(metadata.starting_time.as_nanos(), min);
                    prop_assert_eq!(metadata.duration.as_nanos(), u128::from(max.abs_diff(min)));
                }
                _ => prop_assert!(metadata.first_message_time().is_none()),
            }
        }

        #[test]
        fn every_compression_mode_yields_consistent_catalog(
            mode in compression_mode_strategy(),
            session in session_strategy(24),
        ) {
            let fake = FakeCompressor::new();
            let plugins = fake.plugins();
            let mut bag = TestBag::file_with(|w| w.with_compression_factory(Box::new(plugins)));
            bag.open_split(KIB, &CompressionOptions::new(mode, FAKE_COMPRESSOR_ID)).unwrap();

            let metadata = record_session(&mut bag, &session).unwrap();

            assert_catalog_consistent(&metadata);
            prop_assert_eq!(metadata.compression_mode.as_str(), mode.as_str());
            for relative in &metadata.relative_segment_paths {
                prop_assert!(bag.resolve(relative).exists());
            }
        }
    }

    #[test]
    fn rotation_at_100_kib_keeps_topics() {
        let mut bag = TestBag::file();
        bag.open_split(100 * KIB, &no_compression()).unwrap();
        bag.writer.create_topic(&topic("/camera")).unwrap();
        bag.writer.create_topic(&topic("/imu")).unwrap();

        let first = bag.writer.current_segment().unwrap().to_path_buf();
        let mut ts = 0;
        while std::fs::metadata(&first).unwrap().len() <= 100 * KIB {
            ts += 1;
            bag.writer.write(record("/camera", 4096, ts)).unwrap();
        }
        bag.writer.write(record("/imu", 32, ts + 1)).unwrap();
        let metadata = bag.writer.close().unwrap().unwrap();

        assert_eq!(metadata.relative_segment_paths, ["bag.seg", "bag_1.seg"]);
        let frames = read_segment(&bag.resolve("bag_1.seg")).unwrap();
        let recreated: Vec<_> = frames
            .iter()
            .filter_map(|frame| match frame {
                Frame::TopicCreated(topic) => Some(topic.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(recreated, ["/camera", "/imu"]);
        assert_eq!(count_segment_messages(&bag.resolve("bag_1.seg"))["/imu"], 1);
        assert_eq!(
            count_segment_messages(&bag.resolve("bag.seg"))["/camera"],
            metadata.per_topic_counts["/camera"].message_count
        );
    }

    #[test]
    fn file_mode_suffixes_every_segment() {
        let fake = FakeCompressor::new();
        let plugins = fake.plugins();
        let mut bag = TestBag::file_with(|w| w.with_compression_factory(Box::new(plugins)));
        bag.open_split(KIB, &CompressionOptions::new(CompressionMode::File, FAKE_COMPRESSOR_ID))
            .unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();
        for ts in 0..20 {
            bag.writer.write(record("/a", 200, ts)).unwrap();
        }
        let metadata = bag.writer.close().unwrap().unwrap();

        assert!(metadata.relative_segment_paths.len() > 1);
        for relative in &metadata.relative_segment_paths {
            assert!(relative.ends_with(".seg.fake"), "{relative}");
            assert!(!bag.resolve(relative.trim_end_matches(".fake")).exists());
        }
        let log = fake.log();
        assert_eq!(log.files.len(), metadata.relative_segment_paths.len());
        assert_eq!(log.records, 0);
        assert_eq!(
            bag.events.count(|e| matches!(e, WriterEvent::SegmentCompressed { .. })),
            log.files.len()
        );
    }

    #[test]
    fn message_mode_compresses_every_record() {
        let fake = FakeCompressor::new();
        let plugins = fake.plugins();
        let mut bag = TestBag::memory_with(|w| w.with_compression_factory(Box::new(plugins)));
        bag.open_split(KIB, &CompressionOptions::new(CompressionMode::Message, FAKE_COMPRESSOR_ID))
            .unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();
        for ts in 0..25 {
            bag.writer.write(record("/a", 100, ts)).unwrap();
        }
        let metadata = bag.writer.close().unwrap().unwrap();

        let store = bag.store.clone().unwrap();
        let mut stored = 0;
        for relative in &metadata.relative_segment_paths {
            assert!(relative.ends_with(".seg"), "{relative}");
            let segment = store.segment(&bag.resolve(relative)).unwrap();
            for message in segment.messages() {
                assert!(message.payload.starts_with(FAKE_PAYLOAD_PREFIX));
                stored += 1;
            }
        }
        assert_eq!(stored, 25);
        assert_eq!(fake.log().records, 25);
        assert!(fake.log().files.is_empty());
    }

    #[test]
    fn zstd_segments_decompress_to_recorded_messages() {
        let mut bag = TestBag::file();
        bag.open_split(4 * KIB, &CompressionOptions::new(CompressionMode::File, "zstd"))
            .unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();
        bag.writer.create_topic(&topic("/b")).unwrap();
        for ts in 0..60 {
            let name = if ts % 3 == 0 { "/b" } else { "/a" };
            bag.writer.write(record(name, 300, ts)).unwrap();
        }
        let metadata = bag.writer.close().unwrap().unwrap();

        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        let mut decompressor = ZstdDecompressor::new();
        for relative in &metadata.relative_segment_paths {
            let restored = decompressor.decompress_file(&bag.resolve(relative)).unwrap();
            for (name, count) in count_segment_messages(&restored) {
                *totals.entry(name).or_insert(0) += count;
            }
        }
        assert_eq!(totals["/a"], metadata.per_topic_counts["/a"].message_count);
        assert_eq!(totals["/b"], metadata.per_topic_counts["/b"].message_count);
        assert_eq!(totals.values().sum::<u64>(), 60);
    }

    #[test]
    fn failing_compressor_keeps_bag_usable() {
        let mut bag =
            TestBag::file_with(|w| w.with_compression_factory(Box::new(FailingCompressor::plugins())));
        bag.open_split(KIB, &CompressionOptions::new(CompressionMode::File, FAILING_COMPRESSOR_ID))
            .unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();
        for ts in 0..12 {
            bag.writer.write(record("/a", 300, ts)).unwrap();
        }
        let metadata = bag.writer.close().unwrap().unwrap();

        for relative in &metadata.relative_segment_paths {
            assert!(relative.ends_with(".seg"));
            assert!(bag.resolve(relative).exists());
        }
        assert_eq!(
            bag.events
                .count(|e| matches!(e, WriterEvent::SegmentCompressionFailed { .. })),
            metadata.relative_segment_paths.len()
        );
        assert_eq!(metadata.per_topic_counts["/a"].message_count, 12);
    }

    #[test]
    fn converter_sees_topics_and_records() {
        let converter = TaggingConverter::new("json");
        let plugins = converter.plugins("cbor", "json");
        let mut bag = TestBag::memory_with(|w| w.with_converter_factory(Box::new(plugins)));
        let options = bag.options();
        bag.writer
            .open_with(&options, &ConverterOptions::new("cbor", "json"))
            .unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();
        bag.writer
            .write(segbag_core::SerializedRecord::new("/a", b"raw".to_vec(), 1))
            .unwrap();

        assert_eq!(
            converter.registered(),
            [("/a".to_string(), "test_msgs/Blob".to_string())]
        );
        let store = bag.store.clone().unwrap();
        let segment = store.segment(bag.writer.current_segment().unwrap()).unwrap();
        assert_eq!(segment.messages()[0].payload.as_ref(), b"json:raw");
    }

    #[test]
    fn conversion_runs_before_payload_compression() {
        let converter = TaggingConverter::new("json");
        let converters = converter.plugins("cbor", "json");
        let fake = FakeCompressor::new();
        let compressors = fake.plugins();
        let mut bag = TestBag::memory_with(|w| {
            w.with_converter_factory(Box::new(converters))
                .with_compression_factory(Box::new(compressors))
        });
        let options = bag.options();
        bag.writer
            .open(
                &options,
                &ConverterOptions::new("cbor", "json"),
                &CompressionOptions::new(CompressionMode::Message, FAKE_COMPRESSOR_ID),
            )
            .unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();
        bag.writer
            .write(segbag_core::SerializedRecord::new("/a", b"raw".to_vec(), 1))
            .unwrap();

        let store = bag.store.clone().unwrap();
        let segment = store.segment(bag.writer.current_segment().unwrap()).unwrap();
        assert_eq!(segment.messages()[0].payload.as_ref(), b"FAKE:json:raw");
    }

    #[test]
    fn storage_unavailable_at_open() {
        let factory = FailingStorageFactory::new(MemoryStorageFactory::new(), 0);
        let writer = Writer::new(Box::new(factory), Box::new(JsonMetadataIo::new()));
        let mut bag = TestBag::with_writer(writer, segbag_storage::MEMORY_STORAGE_ID);

        let result = bag.open_default();

        assert!(matches!(result, Err(WriterError::StorageUnavailable { .. })));
        assert!(!bag.writer.is_open());
        assert_eq!(bag.events.count(|e| matches!(e, WriterEvent::Opened { .. })), 0);
    }

    #[test]
    fn rotation_failure_discards_catalog() {
        let metadata_io = MemoryMetadataIo::new();
        let factory = FailingStorageFactory::new(FileStorageFactory::new(), 2);
        let writer = Writer::new(Box::new(factory), Box::new(metadata_io.clone()));
        let mut bag = TestBag::with_writer(writer, FILE_STORAGE_ID);
        bag.open_split(KIB, &no_compression()).unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();

        let mut failure = None;
        for ts in 0..50 {
            if let Err(e) = bag.writer.write(record("/a", 300, ts)) {
                failure = Some(e);
                break;
            }
        }

        let failure = failure.expect("third segment must fail to open");
        assert_eq!(failure.kind(), ErrorKind::Fatal);
        assert!(!bag.writer.is_open());
        assert!(metadata_io.is_empty());
        assert_eq!(
            bag.events.count(|e| matches!(e, WriterEvent::SessionAborted { .. })),
            1
        );
        assert!(matches!(
            bag.writer.write(record("/a", 1, 0)),
            Err(WriterError::NotOpen)
        ));
    }

    #[test]
    fn persist_failure_reported_on_close() {
        let writer = Writer::new(
            Box::new(MemoryStorageFactory::new()),
            Box::new(MemoryMetadataIo::failing()),
        );
        let mut bag = TestBag::with_writer(writer, segbag_storage::MEMORY_STORAGE_ID);
        bag.open_default().unwrap();

        let result = bag.writer.close();

        assert!(matches!(result, Err(WriterError::Metadata(_))));
        assert!(!bag.writer.is_open());
        assert_eq!(bag.writer.stats().sessions_aborted(), 1);
    }

    #[test]
    fn removed_topic_leaves_catalog() {
        let metadata_io = MemoryMetadataIo::new();
        let writer = Writer::new(
            Box::new(MemoryStorageFactory::new()),
            Box::new(metadata_io.clone()),
        );
        let mut bag = TestBag::with_writer(writer, segbag_storage::MEMORY_STORAGE_ID);
        bag.open_default().unwrap();
        bag.writer.create_topic(&topic("/keep")).unwrap();
        bag.writer.create_topic(&topic("/drop")).unwrap();
        bag.writer.write(record("/keep", 8, 1)).unwrap();
        bag.writer.write(record("/drop", 8, 2)).unwrap();
        bag.writer.remove_topic(&topic("/drop")).unwrap();
        bag.writer.close().unwrap();

        let metadata = metadata_io.persisted(&bag.location()).unwrap();
        assert!(metadata.per_topic_counts.contains_key("/keep"));
        assert!(!metadata.per_topic_counts.contains_key("/drop"));
        assert_eq!(metadata.message_count, 1);
        assert_catalog_consistent(&metadata);
    }

    #[test]
    fn catalog_file_round_trips() {
        let mut bag = TestBag::file();
        bag.open_default().unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();
        bag.writer.write(record("/a", 16, 5)).unwrap();
        let metadata = bag.writer.close().unwrap().unwrap();

        assert!(bag.resolve(METADATA_FILENAME).exists());
        assert_eq!(JsonMetadataIo::new().load(&bag.location()).unwrap(), metadata);
        assert_eq!(metadata.storage_identifier, FILE_STORAGE_ID);
    }

    #[test]
    fn events_follow_session_lifecycle() {
        let mut bag = TestBag::memory();
        bag.open_split(512, &no_compression()).unwrap();
        bag.writer.create_topic(&topic("/a")).unwrap();
        for ts in 0..10 {
            bag.writer.write(record("/a", 128, ts)).unwrap();
        }
        bag.writer.close().unwrap();

        let events = bag.events.events();
        assert!(matches!(events.first(), Some(WriterEvent::Opened { .. })));
        assert!(matches!(
            events.last(),
            Some(WriterEvent::Closed { message_count: 10, .. })
        ));
        let rotations = bag
            .events
            .count(|e| matches!(e, WriterEvent::SegmentRotated { .. }));
        assert_eq!(rotations as u64, bag.writer.stats().rotations());
        assert!(rotations > 0);
    }

    #[test]
    fn explicit_storage_options_round_trip_through_json() {
        let options = StorageOptions::new("/data/run").max_segment_size_bytes(4096);
        let json = serde_json::to_string(&options).unwrap();
        let parsed: StorageOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, options);

        let compression: CompressionOptions =
            serde_json::from_str(r#"{"mode":"ZIP","format":"zstd"}"#).unwrap();
        assert_eq!(compression.mode, CompressionMode::None);
    }

    #[test]
    fn shared_sink_sees_every_writer() {
        let sink = Arc::new(CapturingEventSink::new());
        let temp = tempfile::tempdir().unwrap();
        for name in ["one", "two"] {
            let mut writer = Writer::new(
                Box::new(FileStorageFactory::new()),
                Box::new(JsonMetadataIo::new()),
            )
            .with_event_sink(sink.clone());
            writer
                .open_with(&StorageOptions::new(temp.path().join(name)), &same_format())
                .unwrap();
        }
        assert_eq!(sink.count(|e| matches!(e, WriterEvent::Closed { .. })), 2);
    }
}
