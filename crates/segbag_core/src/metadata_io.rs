//! Catalog persistence.

use crate::error::{MetadataError, MetadataResult};
use crate::metadata::{BagMetadata, METADATA_VERSION};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Name of the catalog file inside the bag directory.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Temporary file for atomic catalog writes.
const METADATA_TEMP: &str = "metadata.json.tmp";

/// Persists and loads the catalog of a bag directory.
pub trait MetadataIo: Send + Sync {
    /// Writes `metadata` into `directory`, replacing any previous catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be serialized or written.
    fn persist(&self, directory: &Path, metadata: &BagMetadata) -> MetadataResult<()>;

    /// Reads the catalog of `directory`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is missing, malformed, or written by
    /// a newer format version.
    fn load(&self, directory: &Path) -> MetadataResult<BagMetadata>;
}

/// Stores the catalog as pretty-printed JSON in [`METADATA_FILENAME`].
///
/// Writes go to a temporary file that is synced and then renamed over the
/// catalog, so readers see either the old or the new catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetadataIo;

impl JsonMetadataIo {
    /// Creates the JSON catalog writer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MetadataIo for JsonMetadataIo {
    fn persist(&self, directory: &Path, metadata: &BagMetadata) -> MetadataResult<()> {
        let temp_path = directory.join(METADATA_TEMP);
        let data = serde_json::to_vec_pretty(metadata)?;

        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, directory.join(METADATA_FILENAME))?;
        sync_directory(directory)?;
        Ok(())
    }

    fn load(&self, directory: &Path) -> MetadataResult<BagMetadata> {
        let data = fs::read(directory.join(METADATA_FILENAME))?;
        let metadata: BagMetadata = serde_json::from_slice(&data)?;
        if metadata.version > METADATA_VERSION {
            return Err(MetadataError::UnsupportedVersion(metadata.version));
        }
        Ok(metadata)
    }
}

#[cfg(unix)]
fn sync_directory(directory: &Path) -> MetadataResult<()> {
    File::open(directory)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) -> MetadataResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompressionMode;
    use crate::registry::TopicRegistry;
    use segbag_storage::TopicMetadata;
    use tempfile::tempdir;

    fn sample() -> BagMetadata {
        let mut topics = TopicRegistry::new();
        topics.register(&TopicMetadata::new("/a", "pkg/A", "cdr"));
        topics.record_message("/a");
        topics.record_message("/a");

        let mut metadata = BagMetadata::new("segfile");
        metadata.push_segment("run.seg.zstd");
        metadata.record_message(100);
        metadata.record_message(40);
        metadata.finalize(&topics, 2048, "zstd", CompressionMode::File);
        metadata
    }

    #[test]
    fn persist_then_load() {
        let dir = tempdir().unwrap();
        let io = JsonMetadataIo::new();
        let metadata = sample();

        io.persist(dir.path(), &metadata).unwrap();

        assert!(dir.path().join(METADATA_FILENAME).exists());
        assert!(!dir.path().join(METADATA_TEMP).exists());
        assert_eq!(io.load(dir.path()).unwrap(), metadata);
    }

    #[test]
    fn persisted_field_names() {
        let dir = tempdir().unwrap();
        JsonMetadataIo::new().persist(dir.path(), &sample()).unwrap();

        let raw = fs::read(dir.path().join(METADATA_FILENAME)).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(json["storage_identifier"], "segfile");
        assert_eq!(json["relative_segment_paths"][0], "run.seg.zstd");
        assert_eq!(json["starting_time"], 40);
        assert_eq!(json["duration"], 60);
        assert_eq!(json["message_count"], 2);
        assert_eq!(json["per_topic_counts"]["/a"]["message_count"], 2);
        assert_eq!(json["total_size_bytes"], 2048);
        assert_eq!(json["compression_format"], "zstd");
        assert_eq!(json["compression_mode"], "FILE");
    }

    #[test]
    fn persist_replaces_previous_catalog() {
        let dir = tempdir().unwrap();
        let io = JsonMetadataIo::new();
        io.persist(dir.path(), &BagMetadata::new("memory")).unwrap();
        io.persist(dir.path(), &sample()).unwrap();
        assert_eq!(io.load(dir.path()).unwrap().storage_identifier, "segfile");
    }

    #[test]
    fn newer_version_rejected() {
        let dir = tempdir().unwrap();
        let mut metadata = sample();
        metadata.version = METADATA_VERSION + 1;
        JsonMetadataIo::new().persist(dir.path(), &metadata).unwrap();

        let result = JsonMetadataIo::new().load(dir.path());
        assert!(matches!(result, Err(MetadataError::UnsupportedVersion(2))));
    }

    #[test]
    fn missing_catalog_is_io_error() {
        let dir = tempdir().unwrap();
        let result = JsonMetadataIo::new().load(dir.path());
        assert!(matches!(result, Err(MetadataError::Io(_))));
    }
}
