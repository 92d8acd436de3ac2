//! Registry of storage backends keyed by storage id.

use crate::backend::{SegmentStorage, StorageFactory};
use crate::error::{StorageError, StorageResult};
use crate::file::{FileStorageFactory, FILE_STORAGE_ID};
use crate::memory::{MemoryStorageFactory, MEMORY_STORAGE_ID};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Dispatches [`StorageFactory::open_read_write`] to the backend registered
/// for the requested storage id.
///
/// # Example
///
/// ```rust
/// use segbag_storage::{StorageFactory, StoragePlugins};
///
/// let plugins = StoragePlugins::with_defaults();
/// assert!(plugins.contains("segfile"));
/// assert!(plugins.contains("memory"));
/// ```
#[derive(Default)]
pub struct StoragePlugins {
    backends: HashMap<String, Box<dyn StorageFactory>>,
}

impl StoragePlugins {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in `segfile` and `memory` backends.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .register(FILE_STORAGE_ID, FileStorageFactory::new())
            .register(MEMORY_STORAGE_ID, MemoryStorageFactory::new())
    }

    /// Registers a backend under `storage_id`, replacing any previous one.
    #[must_use]
    pub fn register(mut self, storage_id: impl Into<String>, factory: impl StorageFactory + 'static) -> Self {
        self.backends.insert(storage_id.into(), Box::new(factory));
        self
    }

    /// Returns true if a backend is registered for `storage_id`.
    #[must_use]
    pub fn contains(&self, storage_id: &str) -> bool {
        self.backends.contains_key(storage_id)
    }
}

impl StorageFactory for StoragePlugins {
    fn open_read_write(
        &self,
        location: &Path,
        storage_id: &str,
    ) -> StorageResult<Box<dyn SegmentStorage>> {
        let factory = self
            .backends
            .get(storage_id)
            .ok_or_else(|| StorageError::UnknownBackend(storage_id.to_string()))?;
        factory.open_read_write(location, storage_id)
    }
}

impl fmt::Debug for StoragePlugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.backends.keys().collect();
        ids.sort();
        f.debug_struct("StoragePlugins")
            .field("backends", &ids)
            .finish()
    }
}
