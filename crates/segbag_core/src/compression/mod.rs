//! Compression of segments and records.
//!
//! Compression runs at one of two granularities:
//!
//! - `FILE`: a segment is compressed as a whole after it has been closed,
//!   and its catalog entry is replaced by the compressed file
//! - `MESSAGE`: every record payload is compressed before it is stored
//!
//! Compressors are plugins resolved by format name through a
//! [`CompressionFactory`], once, when a bag is opened.

mod orchestrator;
mod plugins;
mod traits;
mod zstd;

pub use orchestrator::{CompressionOrchestrator, SegmentCompression};
pub use plugins::CompressionPlugins;
pub use traits::{compressed_path, CompressionFactory, Compressor, Decompressor};
pub use self::zstd::{ZstdCompressor, ZstdDecompressor, ZSTD_IDENTIFIER};
