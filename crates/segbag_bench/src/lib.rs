//! Benchmark utilities.

use segbag_core::{
    CompressionMode, CompressionOptions, ConverterOptions, JsonMetadataIo, SerializedRecord,
    StorageOptions, TopicMetadata, Writer,
};
use segbag_storage::{FileStorageFactory, MemoryStorageFactory, MEMORY_STORAGE_ID};
use std::path::Path;

/// Topic every benchmark writes to.
pub const BENCH_TOPIC: &str = "/bench";

/// Generate a payload of the specified size.
///
/// The pattern repeats every 251 bytes, so it compresses, but not to nothing.
pub fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Topic metadata for [`BENCH_TOPIC`].
pub fn bench_topic() -> TopicMetadata {
    TopicMetadata::new(BENCH_TOPIC, "bench_msgs/Blob", "cdr")
}

/// A record on [`BENCH_TOPIC`].
pub fn bench_record(payload: &[u8], timestamp: i64) -> SerializedRecord {
    SerializedRecord::new(BENCH_TOPIC, payload.to_vec(), timestamp)
}

/// Opens a memory-backed writer at `location` with the bench topic.
pub fn memory_writer(location: &Path, max_segment_size_bytes: u64, mode: CompressionMode) -> Writer {
    let mut writer = Writer::new(
        Box::new(MemoryStorageFactory::new()),
        Box::new(JsonMetadataIo::new()),
    );
    writer
        .open(
            &StorageOptions::new(location)
                .storage_id(MEMORY_STORAGE_ID)
                .max_segment_size_bytes(max_segment_size_bytes),
            &ConverterOptions::new("cdr", "cdr"),
            &CompressionOptions::new(mode, "zstd"),
        )
        .expect("Failed to open memory bag");
    writer
        .create_topic(&bench_topic())
        .expect("Failed to create topic");
    writer
}

/// Opens a file-backed writer at `location` with the bench topic.
pub fn file_writer(location: &Path, max_segment_size_bytes: u64, mode: CompressionMode) -> Writer {
    let mut writer = Writer::new(
        Box::new(FileStorageFactory::new()),
        Box::new(JsonMetadataIo::new()),
    );
    writer
        .open(
            &StorageOptions::new(location).max_segment_size_bytes(max_segment_size_bytes),
            &ConverterOptions::new("cdr", "cdr"),
            &CompressionOptions::new(mode, "zstd"),
        )
        .expect("Failed to open file bag");
    writer
        .create_topic(&bench_topic())
        .expect("Failed to create topic");
    writer
}
