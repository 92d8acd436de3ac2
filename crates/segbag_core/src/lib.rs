//! # segbag core
//!
//! The segmented bag writer.
//!
//! A bag is a recording made of one or more segments plus a metadata
//! catalog. This crate provides:
//! - [`Writer`], the open/write/rotate/close state machine
//! - [`TopicRegistry`] for live topics and per-topic message counters
//! - [`BagMetadata`], the catalog describing a bag without scanning segments
//! - [`next_segment_location`], deterministic segment naming
//! - [`CompressionOrchestrator`] and the compression plugin interfaces
//! - Converter plugin interfaces for serialization format translation
//!
//! ## Example
//!
//! ```rust,no_run
//! use segbag_core::{
//!     CompressionMode, CompressionOptions, ConverterOptions, JsonMetadataIo, StorageOptions,
//!     Writer,
//! };
//! use segbag_storage::{SerializedRecord, StoragePlugins, TopicMetadata};
//!
//! let mut writer = Writer::new(
//!     Box::new(StoragePlugins::with_defaults()),
//!     Box::new(JsonMetadataIo::new()),
//! );
//! writer.open(
//!     &StorageOptions::new("recordings/run_1").max_segment_size_bytes(4 * 1024 * 1024),
//!     &ConverterOptions::new("cdr", "cdr"),
//!     &CompressionOptions::new(CompressionMode::File, "zstd"),
//! )?;
//!
//! let topic = TopicMetadata::new("/chatter", "std_msgs/String", "cdr");
//! writer.create_topic(&topic)?;
//! writer.write(SerializedRecord::new("/chatter", vec![0u8; 32], 1_000))?;
//! let catalog = writer.close()?;
//! # Ok::<(), segbag_core::WriterError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod compression;
mod config;
pub mod converter;
mod dir;
mod error;
mod events;
mod metadata;
mod metadata_io;
mod naming;
mod registry;
mod stats;
mod types;
mod writer;

pub use compression::{
    CompressionFactory, CompressionOrchestrator, CompressionPlugins, Compressor, Decompressor,
    SegmentCompression, ZstdCompressor, ZstdDecompressor, ZSTD_IDENTIFIER,
};
pub use config::{
    CompressionMode, CompressionOptions, ConverterOptions, StorageOptions,
    MAX_SEGMENT_SIZE_NO_SPLIT,
};
pub use converter::{CborJsonConverter, Converter, ConverterFactory, ConverterPlugins};
pub use dir::BagDir;
pub use error::{
    CompressionError, CompressionResult, ConversionError, ConversionResult, ErrorKind,
    MetadataError, MetadataResult, UnknownCompressionMode, WriterError, WriterResult,
};
pub use events::{EventSink, TracingEventSink, WriterEvent};
pub use metadata::{BagMetadata, METADATA_VERSION};
pub use metadata_io::{JsonMetadataIo, MetadataIo, METADATA_FILENAME};
pub use naming::next_segment_location;
pub use registry::TopicRegistry;
pub use stats::{StatsSnapshot, WriterStats};
pub use types::{Timestamp, TopicInformation};
pub use writer::Writer;

pub use segbag_storage::{SerializedRecord, TopicMetadata};
