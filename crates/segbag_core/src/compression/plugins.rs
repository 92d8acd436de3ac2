//! Registry of compression plugins keyed by format name.

use super::traits::{CompressionFactory, Compressor, Decompressor};
use super::zstd::{ZstdCompressor, ZstdDecompressor, ZSTD_IDENTIFIER};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type CompressorConstructor = Arc<dyn Fn() -> Box<dyn Compressor> + Send + Sync>;
type DecompressorConstructor = Arc<dyn Fn() -> Box<dyn Decompressor> + Send + Sync>;

/// Maps format names to compressor and decompressor constructors.
///
/// # Example
///
/// ```rust
/// use segbag_core::{CompressionFactory, CompressionPlugins};
///
/// let plugins = CompressionPlugins::with_defaults();
/// let compressor = plugins.resolve_compressor("zstd").unwrap();
/// assert_eq!(compressor.identifier(), "zstd");
/// assert!(plugins.resolve_compressor("lz77").is_none());
/// ```
#[derive(Clone, Default)]
pub struct CompressionPlugins {
    compressors: HashMap<String, CompressorConstructor>,
    decompressors: HashMap<String, DecompressorConstructor>,
}

impl CompressionPlugins {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in `zstd` plugin.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .register_compressor(ZSTD_IDENTIFIER, || Box::new(ZstdCompressor::new()))
            .register_decompressor(ZSTD_IDENTIFIER, || Box::new(ZstdDecompressor::new()))
    }

    /// Registers a compressor constructor for `format`.
    #[must_use]
    pub fn register_compressor<F>(mut self, format: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Compressor> + Send + Sync + 'static,
    {
        self.compressors.insert(format.into(), Arc::new(constructor));
        self
    }

    /// Registers a decompressor constructor for `format`.
    #[must_use]
    pub fn register_decompressor<F>(mut self, format: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Decompressor> + Send + Sync + 'static,
    {
        self.decompressors.insert(format.into(), Arc::new(constructor));
        self
    }
}

impl CompressionFactory for CompressionPlugins {
    fn resolve_compressor(&self, format: &str) -> Option<Box<dyn Compressor>> {
        let constructor = self.compressors.get(format);
        if constructor.is_none() {
            tracing::error!(target: "segbag::compression", format, "requested compressor does not exist");
        }
        constructor.map(|constructor| constructor())
    }

    fn resolve_decompressor(&self, format: &str) -> Option<Box<dyn Decompressor>> {
        let constructor = self.decompressors.get(format);
        if constructor.is_none() {
            tracing::error!(target: "segbag::compression", format, "requested decompressor does not exist");
        }
        constructor.map(|constructor| constructor())
    }
}

impl fmt::Debug for CompressionPlugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut compressors: Vec<_> = self.compressors.keys().collect();
        compressors.sort();
        let mut decompressors: Vec<_> = self.decompressors.keys().collect();
        decompressors.sort();
        f.debug_struct("CompressionPlugins")
            .field("compressors", &compressors)
            .field("decompressors", &decompressors)
            .finish()
    }
}
