//! The bag writer.
//!
//! A [`Writer`] is either closed or holds one open bag. While open it owns
//! exactly one live segment handle, rotates to a new segment when the
//! active one outgrows the configured size, and seals the catalog when the
//! bag is closed.
//!
//! ## Error model
//!
//! - Precondition errors (not open, unknown topic) change nothing.
//! - Conversion errors reject the record; the bag stays usable.
//! - Compression failures are reported through the event sink and the
//!   data is kept uncompressed.
//! - Any other error is fatal: the session is discarded, no catalog is
//!   written and the writer is closed again.

use crate::compression::{CompressionFactory, CompressionOrchestrator, CompressionPlugins};
use crate::config::{CompressionMode, CompressionOptions, ConverterOptions, StorageOptions};
use crate::converter::{Converter, ConverterFactory, ConverterPlugins};
use crate::dir::BagDir;
use crate::error::{WriterError, WriterResult};
use crate::events::{EventSink, TracingEventSink, WriterEvent};
use crate::metadata::BagMetadata;
use crate::metadata_io::MetadataIo;
use crate::registry::TopicRegistry;
use crate::stats::WriterStats;
use segbag_storage::{SegmentStorage, SerializedRecord, StorageFactory, TopicMetadata};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Records topics into a segmented bag.
///
/// # Lifecycle
///
/// `open` → (`create_topic` | `remove_topic` | `write`)* → `close`.
/// Dropping an open writer closes it.
///
/// # Resource ordering
///
/// The active segment handle is always released before the storage
/// factory that created it.
pub struct Writer {
    // Must stay declared before `storage_factory`.
    session: Option<Session>,
    storage_factory: Box<dyn StorageFactory>,
    converter_factory: Box<dyn ConverterFactory>,
    compression_factory: Box<dyn CompressionFactory>,
    metadata_io: Box<dyn MetadataIo>,
    events: Arc<dyn EventSink>,
    stats: WriterStats,
}

impl Writer {
    /// Creates a closed writer.
    ///
    /// Converters and compressors default to the built-in plugins, events
    /// go to `tracing`.
    #[must_use]
    pub fn new(storage_factory: Box<dyn StorageFactory>, metadata_io: Box<dyn MetadataIo>) -> Self {
        Self {
            session: None,
            storage_factory,
            converter_factory: Box::new(ConverterPlugins::with_defaults()),
            compression_factory: Box::new(CompressionPlugins::with_defaults()),
            metadata_io,
            events: Arc::new(TracingEventSink),
            stats: WriterStats::new(),
        }
    }

    /// Replaces the converter plugins.
    #[must_use]
    pub fn with_converter_factory(mut self, factory: Box<dyn ConverterFactory>) -> Self {
        self.converter_factory = factory;
        self
    }

    /// Replaces the compression plugins.
    #[must_use]
    pub fn with_compression_factory(mut self, factory: Box<dyn CompressionFactory>) -> Self {
        self.compression_factory = factory;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Opens a bag and its first segment.
    ///
    /// A converter is only built when the input and output formats differ.
    /// A compressor is only resolved when compression is enabled.
    ///
    /// # Errors
    ///
    /// - [`WriterError::AlreadyOpen`] if a bag is open
    /// - [`WriterError::InvalidOptions`] if the location is empty
    /// - [`WriterError::ConverterUnavailable`] or
    ///   [`WriterError::CompressorUnavailable`] if a plugin is missing
    /// - [`WriterError::BagLocked`] if another writer owns the directory
    /// - [`WriterError::StorageUnavailable`] if no segment can be opened
    pub fn open(
        &mut self,
        storage_options: &StorageOptions,
        converter_options: &ConverterOptions,
        compression_options: &CompressionOptions,
    ) -> WriterResult<()> {
        if self.session.is_some() {
            return Err(WriterError::AlreadyOpen);
        }
        if storage_options.location.as_os_str().is_empty() {
            return Err(WriterError::invalid_options("bag location is empty"));
        }

        let converter = if converter_options.requires_conversion() {
            let input = &converter_options.input_serialization_format;
            let output = &converter_options.output_serialization_format;
            let converter = self
                .converter_factory
                .create_converter(input, output)
                .ok_or_else(|| WriterError::converter_unavailable(input, output))?;
            Some(converter)
        } else {
            None
        };

        let compression =
            CompressionOrchestrator::new(compression_options, self.compression_factory.as_ref())?;

        let dir = BagDir::open(&storage_options.location)?;
        let location = dir.segment_location(0);
        let storage = self
            .storage_factory
            .open_read_write(&location, &storage_options.storage_id)
            .map_err(|e| WriterError::storage_unavailable(&location, e))?;

        let mut metadata = BagMetadata::new(storage.storage_identifier());
        metadata.push_segment(dir.relative(storage.path()));
        metadata.compression_format = compression.format().to_string();
        metadata.compression_mode = compression.mode().as_str().to_string();

        self.events.emit(&WriterEvent::Opened {
            location: dir.path().to_path_buf(),
            storage_id: metadata.storage_identifier.clone(),
            compression_mode: metadata.compression_mode.clone(),
            compression_format: metadata.compression_format.clone(),
        });

        self.session = Some(Session {
            storage: Some(storage),
            dir,
            options: storage_options.clone(),
            converter,
            compression,
            topics: TopicRegistry::new(),
            metadata,
            rotation: 0,
        });
        Ok(())
    }

    /// Opens a bag without compression.
    ///
    /// # Errors
    ///
    /// See [`Writer::open`].
    pub fn open_with(
        &mut self,
        storage_options: &StorageOptions,
        converter_options: &ConverterOptions,
    ) -> WriterResult<()> {
        self.open(storage_options, converter_options, &CompressionOptions::default())
    }

    /// Registers a topic with the bag.
    ///
    /// Registering a topic that already exists does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::NotOpen`] if no bag is open, or a fatal
    /// storage error.
    pub fn create_topic(&mut self, topic: &TopicMetadata) -> WriterResult<()> {
        let result = self.create_topic_inner(topic);
        self.abort_on_fatal(result)
    }

    fn create_topic_inner(&mut self, topic: &TopicMetadata) -> WriterResult<()> {
        let Self {
            session, events, ..
        } = self;
        let session = session.as_mut().ok_or_else(WriterError::not_open)?;

        if session.topics.contains(&topic.name) {
            return Ok(());
        }

        if let Some(converter) = session.converter.as_mut() {
            converter.register_topic(&topic.name, &topic.topic_type)?;
        }
        session.active_storage()?.create_topic(topic)?;
        session.topics.register(topic);

        events.emit(&WriterEvent::TopicCreated {
            name: topic.name.clone(),
        });
        Ok(())
    }

    /// Removes a topic from the bag.
    ///
    /// Messages already written for the topic stay in their segments but
    /// the topic no longer appears in the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::NotOpen`] if no bag is open,
    /// [`WriterError::TopicNotRegistered`] if the topic is unknown, or a
    /// fatal storage error.
    pub fn remove_topic(&mut self, topic: &TopicMetadata) -> WriterResult<()> {
        let result = self.remove_topic_inner(topic);
        self.abort_on_fatal(result)
    }

    fn remove_topic_inner(&mut self, topic: &TopicMetadata) -> WriterResult<()> {
        let Self {
            session, events, ..
        } = self;
        let session = session.as_mut().ok_or_else(WriterError::not_open)?;

        let registered = session
            .topics
            .get(&topic.name)
            .map(|info| info.metadata.clone())
            .ok_or_else(|| WriterError::topic_not_registered(&topic.name))?;

        session.active_storage()?.remove_topic(&registered)?;
        session.topics.remove(&registered.name);

        events.emit(&WriterEvent::TopicRemoved {
            name: registered.name,
        });
        Ok(())
    }

    /// Writes a record to the active segment.
    ///
    /// Rotates first if the active segment has outgrown the size limit, so
    /// the record lands in the new segment. The record is then converted
    /// and, in MESSAGE mode, its payload compressed.
    ///
    /// # Errors
    ///
    /// - [`WriterError::NotOpen`] or [`WriterError::TopicNotRegistered`]
    /// - [`WriterError::Conversion`] if the payload cannot be converted;
    ///   the record is dropped and the bag stays open
    /// - a fatal storage error, which closes the writer
    pub fn write(&mut self, record: SerializedRecord) -> WriterResult<()> {
        let result = self.write_inner(record);
        self.abort_on_fatal(result)
    }

    fn write_inner(&mut self, record: SerializedRecord) -> WriterResult<()> {
        let Self {
            session,
            storage_factory,
            events,
            stats,
            ..
        } = self;
        let session = session.as_mut().ok_or_else(WriterError::not_open)?;

        if !session.topics.contains(&record.topic_name) {
            return Err(WriterError::topic_not_registered(&record.topic_name));
        }

        if session.should_split()? {
            session.rotate(&**storage_factory, &**events, stats)?;
        }

        let record = match session.converter.as_ref() {
            Some(converter) => converter.convert(&record)?,
            None => record,
        };

        let record = if session.compression.mode() == CompressionMode::Message {
            match session.compression.compress_record(&record) {
                Ok(compressed) => compressed,
                Err(e) => {
                    stats.record_compression_failure();
                    events.emit(&WriterEvent::RecordCompressionFailed {
                        topic: record.topic_name.clone(),
                        error: e.to_string(),
                    });
                    record
                }
            }
        } else {
            record
        };

        session.active_storage()?.write(&record)?;
        session.topics.record_message(&record.topic_name);
        session.metadata.record_message(record.timestamp);
        stats.record_write(record.len() as u64);
        Ok(())
    }

    /// Closes the bag and persists its catalog.
    ///
    /// In FILE mode the last segment is compressed first. Returns the
    /// persisted catalog, or `None` if no bag was open.
    ///
    /// # Errors
    ///
    /// Returns an error if the last segment cannot be closed or the catalog
    /// cannot be written. The writer is closed either way.
    pub fn close(&mut self) -> WriterResult<Option<BagMetadata>> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };

        match session.finish(self.events.as_ref(), &self.stats, self.metadata_io.as_ref()) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) => {
                self.stats.record_abort();
                self.events.emit(&WriterEvent::SessionAborted {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Returns true if a bag is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the live topics of the open bag.
    #[must_use]
    pub fn topics(&self) -> Option<&TopicRegistry> {
        self.session.as_ref().map(|s| &s.topics)
    }

    /// Returns the catalog of the open bag as tracked so far.
    ///
    /// Per-topic counts are only filled in when the bag is closed.
    #[must_use]
    pub fn metadata(&self) -> Option<&BagMetadata> {
        self.session.as_ref().map(|s| &s.metadata)
    }

    /// Returns the path of the active segment.
    #[must_use]
    pub fn current_segment(&self) -> Option<&Path> {
        self.session
            .as_ref()
            .and_then(|s| s.storage.as_ref())
            .map(|storage| storage.path())
    }

    /// Returns the writer's counters.
    #[must_use]
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    fn abort_on_fatal<T>(&mut self, result: WriterResult<T>) -> WriterResult<T> {
        if let Err(e) = &result {
            if e.is_fatal() {
                if let Some(session) = self.session.take() {
                    session.abort();
                    self.stats.record_abort();
                    self.events.emit(&WriterEvent::SessionAborted {
                        error: e.to_string(),
                    });
                }
            }
        }
        result
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        // Failures were already reported through the event sink.
        let _ = self.close();
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("open", &self.is_open())
            .field("current_segment", &self.current_segment())
            .field("stats", &self.stats)
            .finish()
    }
}

/// State of an open bag.
struct Session {
    // Released before the directory lock.
    storage: Option<Box<dyn SegmentStorage>>,
    dir: BagDir,
    options: StorageOptions,
    converter: Option<Box<dyn Converter>>,
    compression: CompressionOrchestrator,
    topics: TopicRegistry,
    metadata: BagMetadata,
    rotation: u64,
}

impl Session {
    fn active_storage(&mut self) -> WriterResult<&mut Box<dyn SegmentStorage>> {
        self.storage.as_mut().ok_or_else(WriterError::not_open)
    }

    fn should_split(&self) -> WriterResult<bool> {
        if !self.options.splits() {
            return Ok(false);
        }
        let Some(storage) = self.storage.as_ref() else {
            return Ok(false);
        };
        Ok(storage.current_size_bytes()? > self.options.max_segment_size_bytes)
    }

    /// Closes the active segment and returns its path.
    fn close_active(&mut self) -> WriterResult<PathBuf> {
        let storage = self.storage.take().ok_or_else(WriterError::not_open)?;
        let path = storage.path().to_path_buf();
        storage.close()?;
        Ok(path)
    }

    fn rotate(
        &mut self,
        factory: &dyn StorageFactory,
        events: &dyn EventSink,
        stats: &WriterStats,
    ) -> WriterResult<()> {
        let closed = self.close_active()?;

        self.rotation += 1;
        let location = self.dir.segment_location(self.rotation);
        let mut storage = factory
            .open_read_write(&location, &self.options.storage_id)
            .map_err(|e| WriterError::storage_unavailable(&location, e))?;

        for topic in self.topics.topics() {
            storage.create_topic(topic)?;
        }

        let opened = storage.path().to_path_buf();
        self.metadata.push_segment(self.dir.relative(&opened));
        self.storage = Some(storage);

        stats.record_rotation();
        events.emit(&WriterEvent::SegmentRotated {
            closed: closed.clone(),
            opened,
            rotation: self.rotation,
        });

        self.seal_segment(&closed, events, stats);
        Ok(())
    }

    /// Compresses a closed segment in FILE mode. Failures keep the
    /// uncompressed segment in the catalog.
    fn seal_segment(&mut self, closed: &Path, events: &dyn EventSink, stats: &WriterStats) {
        if self.compression.mode() != CompressionMode::File {
            return;
        }

        match self.compression.compress_segment(closed) {
            Ok(outcome) => {
                self.metadata
                    .replace_segment(&self.dir.relative(closed), self.dir.relative(&outcome.path));
                stats.record_segment_compressed();
                events.emit(&WriterEvent::SegmentCompressed {
                    original: closed.to_path_buf(),
                    compressed: outcome.path,
                    elapsed: outcome.elapsed,
                });
            }
            Err(e) => {
                stats.record_compression_failure();
                events.emit(&WriterEvent::SegmentCompressionFailed {
                    path: closed.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn finish(
        mut self,
        events: &dyn EventSink,
        stats: &WriterStats,
        metadata_io: &dyn MetadataIo,
    ) -> WriterResult<BagMetadata> {
        let closed = self.close_active()?;
        self.seal_segment(&closed, events, stats);

        let total_size_bytes = self
            .metadata
            .relative_segment_paths
            .iter()
            .map(|relative| {
                fs::metadata(self.dir.path().join(relative)).map_or(0, |meta| meta.len())
            })
            .sum();

        self.metadata.finalize(
            &self.topics,
            total_size_bytes,
            self.compression.format(),
            self.compression.mode(),
        );
        metadata_io.persist(self.dir.path(), &self.metadata)?;

        events.emit(&WriterEvent::Closed {
            location: self.dir.path().to_path_buf(),
            segments: self.metadata.relative_segment_paths.len(),
            message_count: self.metadata.message_count,
        });
        Ok(self.metadata)
    }

    /// Releases the active segment without writing a catalog.
    fn abort(mut self) {
        if let Some(storage) = self.storage.take() {
            let _ = storage.close();
        }
    }
}
