//! Applies the configured compression policy.

use super::traits::{CompressionFactory, Compressor};
use crate::config::{CompressionMode, CompressionOptions};
use crate::error::{CompressionError, CompressionResult, WriterError, WriterResult};
use segbag_storage::SerializedRecord;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of compressing a closed segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCompression {
    /// The compressed file. The original has been deleted.
    pub path: PathBuf,
    /// Time spent compressing.
    pub elapsed: Duration,
}

/// Owns the compressor of an open bag and applies the compression mode.
pub struct CompressionOrchestrator {
    mode: CompressionMode,
    compressor: Option<Box<dyn Compressor>>,
}

impl CompressionOrchestrator {
    /// Resolves the compressor for `options`.
    ///
    /// No compressor is resolved for [`CompressionMode::None`].
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::CompressorUnavailable`] if a compressing mode
    /// is requested and no compressor exists for the format.
    pub fn new(options: &CompressionOptions, factory: &dyn CompressionFactory) -> WriterResult<Self> {
        if options.mode == CompressionMode::None {
            return Ok(Self::disabled());
        }
        let compressor = factory
            .resolve_compressor(&options.format)
            .ok_or_else(|| WriterError::compressor_unavailable(&options.format))?;
        Ok(Self {
            mode: options.mode,
            compressor: Some(compressor),
        })
    }

    /// Creates an orchestrator that never compresses.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            mode: CompressionMode::None,
            compressor: None,
        }
    }

    /// Returns the compression mode.
    #[must_use]
    pub fn mode(&self) -> CompressionMode {
        self.mode
    }

    /// Returns the compressor identifier, empty when compression is off.
    #[must_use]
    pub fn format(&self) -> &str {
        self.compressor.as_ref().map_or("", |c| c.identifier())
    }

    /// Compresses a closed segment and deletes the original.
    ///
    /// The original is only deleted once the compressed file exists. On
    /// error the original is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if no compressor is configured, compression fails,
    /// or the compressed file is missing or could not replace the original.
    pub fn compress_segment(&mut self, path: &Path) -> CompressionResult<SegmentCompression> {
        let compressor = self.compressor.as_mut().ok_or(CompressionError::NotConfigured)?;

        let start = Instant::now();
        let compressed = compressor.compress_file(path)?;
        let elapsed = start.elapsed();

        if !compressed.is_file() {
            return Err(CompressionError::MissingOutput(compressed));
        }
        if let Err(e) = fs::remove_file(path) {
            let _ = fs::remove_file(&compressed);
            return Err(e.into());
        }

        Ok(SegmentCompression {
            path: compressed,
            elapsed,
        })
    }

    /// Returns a copy of `record` with a compressed payload.
    ///
    /// # Errors
    ///
    /// Returns an error if no compressor is configured or compression fails.
    pub fn compress_record(&mut self, record: &SerializedRecord) -> CompressionResult<SerializedRecord> {
        let compressor = self.compressor.as_mut().ok_or(CompressionError::NotConfigured)?;
        compressor.compress_record(record)
    }
}

impl std::fmt::Debug for CompressionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionOrchestrator")
            .field("mode", &self.mode)
            .field("format", &self.format())
            .finish()
    }
}
