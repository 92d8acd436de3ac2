//! Fake collaborators for the writer.
//!
//! Every fake records what the writer asked of it so tests can assert on
//! the interaction, not only on the final catalog.

use parking_lot::Mutex;
use segbag_core::{
    BagMetadata, CompressionError, CompressionPlugins, CompressionResult, Compressor,
    ConversionResult, Converter, ConverterPlugins, EventSink, MetadataError, MetadataIo,
    MetadataResult, SerializedRecord, WriterEvent,
};
use segbag_storage::{SegmentStorage, StorageError, StorageFactory, StorageResult};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Identifier of [`FakeCompressor`].
pub const FAKE_COMPRESSOR_ID: &str = "fake";

/// Identifier of [`FailingCompressor`].
pub const FAILING_COMPRESSOR_ID: &str = "failing";

/// Prefix [`FakeCompressor`] puts in front of compressed payloads.
pub const FAKE_PAYLOAD_PREFIX: &[u8] = b"FAKE:";

/// Delegates to another factory until a given number of opens succeeded.
pub struct FailingStorageFactory {
    inner: Box<dyn StorageFactory>,
    opens: AtomicUsize,
    fail_at: usize,
}

impl FailingStorageFactory {
    /// Lets `fail_at` opens through, then fails every later one.
    pub fn new(inner: impl StorageFactory + 'static, fail_at: usize) -> Self {
        Self {
            inner: Box::new(inner),
            opens: AtomicUsize::new(0),
            fail_at,
        }
    }

    /// Returns the number of open attempts so far.
    pub fn attempts(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl StorageFactory for FailingStorageFactory {
    fn open_read_write(
        &self,
        location: &Path,
        storage_id: &str,
    ) -> StorageResult<Box<dyn SegmentStorage>> {
        if self.opens.fetch_add(1, Ordering::SeqCst) >= self.fail_at {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected open failure",
            )));
        }
        self.inner.open_read_write(location, storage_id)
    }
}

/// What a [`FakeCompressor`] was asked to do.
#[derive(Debug, Clone, Default)]
pub struct CompressionLog {
    /// Files passed to `compress_file`, in order.
    pub files: Vec<PathBuf>,
    /// Number of `compress_record` calls.
    pub records: usize,
}

/// Copies files to `<path>.fake` and prefixes payloads with
/// [`FAKE_PAYLOAD_PREFIX`].
#[derive(Debug, Clone, Default)]
pub struct FakeCompressor {
    log: Arc<Mutex<CompressionLog>>,
}

impl FakeCompressor {
    /// Creates a compressor with a fresh log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the call log.
    pub fn log(&self) -> CompressionLog {
        self.log.lock().clone()
    }

    /// Returns plugins resolving [`FAKE_COMPRESSOR_ID`] to compressors
    /// sharing this one's log.
    pub fn plugins(&self) -> CompressionPlugins {
        let shared = self.clone();
        CompressionPlugins::new().register_compressor(FAKE_COMPRESSOR_ID, move || {
            Box::new(shared.clone())
        })
    }
}

impl Compressor for FakeCompressor {
    fn compress_file(&mut self, path: &Path) -> CompressionResult<PathBuf> {
        self.log.lock().files.push(path.to_path_buf());
        let output = PathBuf::from(format!("{}.{FAKE_COMPRESSOR_ID}", path.display()));
        fs::copy(path, &output)?;
        Ok(output)
    }

    fn compress_record(&mut self, record: &SerializedRecord) -> CompressionResult<SerializedRecord> {
        self.log.lock().records += 1;
        let mut payload = FAKE_PAYLOAD_PREFIX.to_vec();
        payload.extend_from_slice(&record.payload);
        Ok(record.with_payload(payload))
    }

    fn identifier(&self) -> &str {
        FAKE_COMPRESSOR_ID
    }
}

/// A compressor whose every operation fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCompressor;

impl FailingCompressor {
    /// Returns plugins resolving [`FAILING_COMPRESSOR_ID`].
    pub fn plugins() -> CompressionPlugins {
        CompressionPlugins::new()
            .register_compressor(FAILING_COMPRESSOR_ID, || Box::new(FailingCompressor))
    }
}

impl Compressor for FailingCompressor {
    fn compress_file(&mut self, _path: &Path) -> CompressionResult<PathBuf> {
        Err(CompressionError::Io(io::Error::new(
            io::ErrorKind::Other,
            "injected compression failure",
        )))
    }

    fn compress_record(&mut self, _record: &SerializedRecord) -> CompressionResult<SerializedRecord> {
        Err(CompressionError::Io(io::Error::new(
            io::ErrorKind::Other,
            "injected compression failure",
        )))
    }

    fn identifier(&self) -> &str {
        FAILING_COMPRESSOR_ID
    }
}

/// Prefixes payloads with `<output>:` and remembers registered topics.
#[derive(Debug, Clone)]
pub struct TaggingConverter {
    tag: Vec<u8>,
    registered: Arc<Mutex<Vec<(String, String)>>>,
}

impl TaggingConverter {
    /// Creates a converter tagging payloads with `output`.
    pub fn new(output: &str) -> Self {
        Self {
            tag: format!("{output}:").into_bytes(),
            registered: Arc::default(),
        }
    }

    /// Returns `(topic, type)` pairs in registration order.
    pub fn registered(&self) -> Vec<(String, String)> {
        self.registered.lock().clone()
    }

    /// Returns plugins building converters from `input` to `output` that
    /// share this one's registrations.
    pub fn plugins(&self, input: &str, output: &str) -> ConverterPlugins {
        let shared = self.clone();
        ConverterPlugins::new().register(input, output, move || Box::new(shared.clone()))
    }
}

impl Converter for TaggingConverter {
    fn register_topic(&mut self, topic_name: &str, topic_type: &str) -> ConversionResult<()> {
        self.registered
            .lock()
            .push((topic_name.to_string(), topic_type.to_string()));
        Ok(())
    }

    fn convert(&self, record: &SerializedRecord) -> ConversionResult<SerializedRecord> {
        let mut payload = self.tag.clone();
        payload.extend_from_slice(&record.payload);
        Ok(record.with_payload(payload))
    }
}

/// Collects every event it receives.
#[derive(Debug, Default)]
pub struct CapturingEventSink {
    events: Mutex<Vec<WriterEvent>>,
}

impl CapturingEventSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events received so far.
    pub fn events(&self) -> Vec<WriterEvent> {
        self.events.lock().clone()
    }

    /// Counts the events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&WriterEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for CapturingEventSink {
    fn emit(&self, event: &WriterEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Keeps catalogs in memory, keyed by bag directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataIo {
    catalogs: Arc<Mutex<HashMap<PathBuf, BagMetadata>>>,
    fail_persist: bool,
}

impl MemoryMetadataIo {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose `persist` always fails.
    pub fn failing() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }

    /// Returns the catalog persisted for `directory`.
    pub fn persisted(&self, directory: &Path) -> Option<BagMetadata> {
        self.catalogs.lock().get(directory).cloned()
    }

    /// Returns the number of persisted catalogs.
    pub fn len(&self) -> usize {
        self.catalogs.lock().len()
    }

    /// Returns true if nothing was persisted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataIo for MemoryMetadataIo {
    fn persist(&self, directory: &Path, metadata: &BagMetadata) -> MetadataResult<()> {
        if self.fail_persist {
            return Err(MetadataError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected persist failure",
            )));
        }
        self.catalogs
            .lock()
            .insert(directory.to_path_buf(), metadata.clone());
        Ok(())
    }

    fn load(&self, directory: &Path) -> MetadataResult<BagMetadata> {
        self.persisted(directory).ok_or_else(|| {
            MetadataError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no catalog for {}", directory.display()),
            ))
        })
    }
}
