//! Writer options.

use crate::error::UnknownCompressionMode;
use segbag_storage::FILE_STORAGE_ID;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Segment size limit meaning "never split".
pub const MAX_SEGMENT_SIZE_NO_SPLIT: u64 = 0;

const COMPRESSION_MODE_NONE: &str = "NONE";
const COMPRESSION_MODE_FILE: &str = "FILE";
const COMPRESSION_MODE_MESSAGE: &str = "MESSAGE";

/// Where and how segments are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// Bag directory. Segments and the catalog are written inside it.
    pub location: PathBuf,

    /// Storage backend id, e.g. `segfile`.
    pub storage_id: String,

    /// Segment size that triggers a rotation, or
    /// [`MAX_SEGMENT_SIZE_NO_SPLIT`].
    pub max_segment_size_bytes: u64,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            location: PathBuf::new(),
            storage_id: FILE_STORAGE_ID.to_string(),
            max_segment_size_bytes: MAX_SEGMENT_SIZE_NO_SPLIT,
        }
    }
}

impl StorageOptions {
    /// Creates options for a bag at `location` with default settings.
    #[must_use]
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Sets the storage backend id.
    #[must_use]
    pub fn storage_id(mut self, storage_id: impl Into<String>) -> Self {
        self.storage_id = storage_id.into();
        self
    }

    /// Sets the segment size that triggers a rotation.
    #[must_use]
    pub const fn max_segment_size_bytes(mut self, size: u64) -> Self {
        self.max_segment_size_bytes = size;
        self
    }

    /// Returns true if segments are rotated at all.
    #[must_use]
    pub const fn splits(&self) -> bool {
        self.max_segment_size_bytes != MAX_SEGMENT_SIZE_NO_SPLIT
    }
}

/// Serialization formats on the way in and out of the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterOptions {
    /// Format records arrive in.
    pub input_serialization_format: String,
    /// Format records are stored in.
    pub output_serialization_format: String,
}

impl ConverterOptions {
    /// Creates converter options.
    #[must_use]
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input_serialization_format: input.into(),
            output_serialization_format: output.into(),
        }
    }

    /// Returns true if records have to be converted.
    #[must_use]
    pub fn requires_conversion(&self) -> bool {
        self.input_serialization_format != self.output_serialization_format
    }
}

/// Granularity at which compression is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompressionMode {
    /// No compression.
    #[default]
    None,
    /// Each segment is compressed as a whole once it is closed.
    File,
    /// Each record payload is compressed before it is stored.
    Message,
}

impl CompressionMode {
    /// Returns the textual value stored in the catalog.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => COMPRESSION_MODE_NONE,
            Self::File => COMPRESSION_MODE_FILE,
            Self::Message => COMPRESSION_MODE_MESSAGE,
        }
    }

    /// Parses a mode, falling back to [`CompressionMode::None`] for values
    /// that are not recognized.
    ///
    /// The rejected value is logged and returned alongside the fallback so
    /// callers can surface it.
    pub fn parse_lenient(value: &str) -> (Self, Option<UnknownCompressionMode>) {
        match value.parse() {
            Ok(mode) => (mode, None),
            Err(err) => {
                tracing::error!(target: "segbag::config", mode = value, "compression mode not supported, using NONE");
                (Self::None, Some(err))
            }
        }
    }
}

impl FromStr for CompressionMode {
    type Err = UnknownCompressionMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" | COMPRESSION_MODE_NONE => Ok(Self::None),
            COMPRESSION_MODE_FILE => Ok(Self::File),
            COMPRESSION_MODE_MESSAGE => Ok(Self::Message),
            other => Err(UnknownCompressionMode(other.to_string())),
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CompressionMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CompressionMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&value).0)
    }
}

/// Compression settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// Compression granularity.
    pub mode: CompressionMode,
    /// Compression format name, e.g. `zstd`. Ignored when `mode` is NONE.
    pub format: String,
}

impl CompressionOptions {
    /// Creates compression options.
    #[must_use]
    pub fn new(mode: CompressionMode, format: impl Into<String>) -> Self {
        Self {
            mode,
            format: format.into(),
        }
    }
}
