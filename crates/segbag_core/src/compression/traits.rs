//! Compression plugin interfaces.

use crate::error::CompressionResult;
use segbag_storage::SerializedRecord;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Compresses segment files and record payloads.
///
/// # Invariants
///
/// - `compress_file` leaves the input file in place; deleting it is the
///   caller's decision
/// - The path returned by `compress_file` is the input path with
///   `.<identifier>` appended
/// - `compress_record` keeps topic and timestamp and replaces the payload
pub trait Compressor: Send {
    /// Compresses the file at `path` and returns the compressed file's path.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or the output cannot be
    /// written. No partial output is left behind.
    fn compress_file(&mut self, path: &Path) -> CompressionResult<PathBuf>;

    /// Returns a copy of `record` with a compressed payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be compressed.
    fn compress_record(&mut self, record: &SerializedRecord) -> CompressionResult<SerializedRecord>;

    /// Identifier of the algorithm, appended to compressed file names.
    fn identifier(&self) -> &str;
}

/// Inverse of a [`Compressor`], used by tools reading bags back.
pub trait Decompressor: Send {
    /// Decompresses the file at `path` and returns the decompressed file's
    /// path, which is `path` without the compression suffix.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not carry this decompressor's suffix
    /// or the data cannot be decompressed.
    fn decompress_file(&mut self, path: &Path) -> CompressionResult<PathBuf>;

    /// Returns a copy of `record` with a decompressed payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid compressed data.
    fn decompress_record(&mut self, record: &SerializedRecord) -> CompressionResult<SerializedRecord>;

    /// Identifier of the algorithm.
    fn identifier(&self) -> &str;
}

/// Resolves compression format names to plugin instances.
pub trait CompressionFactory: Send + Sync {
    /// Creates a compressor for `format`, or `None` if none is registered.
    fn resolve_compressor(&self, format: &str) -> Option<Box<dyn Compressor>>;

    /// Creates a decompressor for `format`, or `None` if none is registered.
    fn resolve_decompressor(&self, format: &str) -> Option<Box<dyn Decompressor>>;
}

/// Returns `path` with `.<identifier>` appended.
#[must_use]
pub fn compressed_path(path: &Path, identifier: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(identifier);
    PathBuf::from(name)
}
