//! Zstandard compression plugin.

use super::traits::{compressed_path, Compressor, Decompressor};
use crate::error::{CompressionError, CompressionResult};
use segbag_storage::SerializedRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Identifier of the zstd plugin, also the suffix of compressed segments.
pub const ZSTD_IDENTIFIER: &str = "zstd";

/// Default compression level. Favors speed, since segments are compressed
/// on the writer thread.
const DEFAULT_LEVEL: i32 = 1;

/// Compresses segments and payloads with Zstandard.
#[derive(Debug, Clone)]
pub struct ZstdCompressor {
    level: i32,
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl ZstdCompressor {
    /// Creates a compressor with the default level.
    #[must_use]
    pub fn new() -> Self {
        Self::with_level(DEFAULT_LEVEL)
    }

    /// Creates a compressor with an explicit zstd level.
    #[must_use]
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Compressor for ZstdCompressor {
    fn compress_file(&mut self, path: &Path) -> CompressionResult<PathBuf> {
        let output = compressed_path(path, ZSTD_IDENTIFIER);
        debug!(target: "segbag::compression::zstd", ?path, ?output, level = self.level, "compressing segment");

        let input = BufReader::new(File::open(path)?);
        let file = OpenOptions::new().write(true).create_new(true).open(&output)?;

        let result = (|| -> CompressionResult<()> {
            let mut writer = BufWriter::new(file);
            ::zstd::stream::copy_encode(input, &mut writer, self.level)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&output);
            return Err(e);
        }
        Ok(output)
    }

    fn compress_record(&mut self, record: &SerializedRecord) -> CompressionResult<SerializedRecord> {
        let compressed = ::zstd::bulk::compress(&record.payload, self.level)?;
        Ok(record.with_payload(compressed))
    }

    fn identifier(&self) -> &str {
        ZSTD_IDENTIFIER
    }
}

/// Decompresses what [`ZstdCompressor`] produced.
#[derive(Debug, Clone, Default)]
pub struct ZstdDecompressor;

impl ZstdDecompressor {
    /// Creates a decompressor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decompressor for ZstdDecompressor {
    fn decompress_file(&mut self, path: &Path) -> CompressionResult<PathBuf> {
        let output = path
            .to_str()
            .and_then(|p| p.strip_suffix(&format!(".{ZSTD_IDENTIFIER}")))
            .map(PathBuf::from)
            .ok_or_else(|| CompressionError::UnexpectedInput {
                path: path.to_path_buf(),
                identifier: ZSTD_IDENTIFIER.to_string(),
            })?;

        let input = BufReader::new(File::open(path)?);
        let file = OpenOptions::new().write(true).create_new(true).open(&output)?;

        let result = (|| -> CompressionResult<()> {
            let mut writer = BufWriter::new(file);
            ::zstd::stream::copy_decode(input, &mut writer)?;
            writer.flush()?;
            Ok(())
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&output);
            return Err(e);
        }
        Ok(output)
    }

    fn decompress_record(&mut self, record: &SerializedRecord) -> CompressionResult<SerializedRecord> {
        let decompressed = ::zstd::decode_all(&record.payload[..])?;
        Ok(record.with_payload(decompressed))
    }

    fn identifier(&self) -> &str {
        ZSTD_IDENTIFIER
    }
}
