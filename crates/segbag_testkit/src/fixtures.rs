//! Test fixtures and bag helpers.
//!
//! Provides temporary bag directories wired to a writer with capturing
//! collaborators.

use crate::fakes::CapturingEventSink;
use segbag_core::{
    CompressionOptions, ConverterOptions, JsonMetadataIo, SerializedRecord, StorageOptions,
    TopicMetadata, Writer, WriterResult,
};
use segbag_storage::{
    FileStorageFactory, MemoryStorageFactory, MemoryStore, FILE_STORAGE_ID, MEMORY_STORAGE_ID,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Serialization format used by fixture topics.
pub const TEST_FORMAT: &str = "cbor";

/// Name of the bag directory inside the fixture's temporary directory.
pub const TEST_BAG_NAME: &str = "bag";

/// A writer recording into a temporary directory.
pub struct TestBag {
    /// The writer under test.
    pub writer: Writer,
    /// Events emitted by the writer.
    pub events: Arc<CapturingEventSink>,
    /// Segment store, for memory bags.
    pub store: Option<MemoryStore>,
    storage_id: &'static str,
    // Dropped after `writer`, which may still write its catalog on drop.
    temp_dir: TempDir,
}

impl TestBag {
    /// Creates a bag backed by in-memory segments.
    pub fn memory() -> Self {
        Self::memory_with(|writer| writer)
    }

    /// Creates a bag backed by segment files.
    pub fn file() -> Self {
        Self::file_with(|writer| writer)
    }

    /// Creates a memory bag, letting `configure` swap the writer's plugins.
    pub fn memory_with(configure: impl FnOnce(Writer) -> Writer) -> Self {
        let factory = MemoryStorageFactory::new();
        let store = factory.store();
        let writer = Writer::new(Box::new(factory), Box::new(JsonMetadataIo::new()));
        Self::build(configure(writer), Some(store), MEMORY_STORAGE_ID)
    }

    /// Creates a file bag, letting `configure` swap the writer's plugins.
    pub fn file_with(configure: impl FnOnce(Writer) -> Writer) -> Self {
        let writer = Writer::new(
            Box::new(FileStorageFactory::new()),
            Box::new(JsonMetadataIo::new()),
        );
        Self::build(configure(writer), None, FILE_STORAGE_ID)
    }

    /// Wraps a writer built from scratch, writing through `storage_id`.
    pub fn with_writer(writer: Writer, storage_id: &'static str) -> Self {
        Self::build(writer, None, storage_id)
    }

    fn build(writer: Writer, store: Option<MemoryStore>, storage_id: &'static str) -> Self {
        let events = Arc::new(CapturingEventSink::new());
        Self {
            writer: writer.with_event_sink(events.clone()),
            events,
            store,
            storage_id,
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the bag directory.
    pub fn location(&self) -> PathBuf {
        self.temp_dir.path().join(TEST_BAG_NAME)
    }

    /// Returns storage options for this bag.
    pub fn options(&self) -> StorageOptions {
        StorageOptions::new(self.location()).storage_id(self.storage_id)
    }

    /// Opens the bag with default options and no conversion.
    pub fn open_default(&mut self) -> WriterResult<()> {
        let options = self.options();
        self.writer.open_with(&options, &same_format())
    }

    /// Opens the bag with a segment size limit and compression options.
    pub fn open_split(&mut self, max_segment_size_bytes: u64, compression: &CompressionOptions) -> WriterResult<()> {
        let options = self.options().max_segment_size_bytes(max_segment_size_bytes);
        self.writer.open(&options, &same_format(), compression)
    }

    /// Resolves a catalog path against the bag directory.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.location().join(relative)
    }
}

/// Converter options that require no conversion.
pub fn same_format() -> ConverterOptions {
    ConverterOptions::new(TEST_FORMAT, TEST_FORMAT)
}

/// Creates topic metadata with a fixture type and format.
pub fn topic(name: &str) -> TopicMetadata {
    TopicMetadata::new(name, "test_msgs/Blob", TEST_FORMAT)
}

/// Creates a record with a `payload_size` byte payload.
pub fn record(topic: &str, payload_size: usize, timestamp: i64) -> SerializedRecord {
    SerializedRecord::new(topic, vec![0xA5u8; payload_size], timestamp)
}
