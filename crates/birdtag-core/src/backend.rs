//! # Storage Backends
//!
//! `StorageBackend` selects between the two shipped catalog stores at
//! runtime while still being a plain `CatalogStore` to the engine:
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed, ACID)

use crate::storage::RedbStore;
use crate::store::{CatalogStore, MemoryStore};
use crate::{CatalogError, MediaRecord, TagMap};
use std::path::Path;

/// Catalog store chosen at startup.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// RedbStore (database handle) cannot be safely cloned.

impl StorageBackend {
    /// Open or create a redb catalog at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    /// Compact the database file.
    ///
    /// Returns `false` when there is nothing to compact (in-memory store).
    pub fn compact(&mut self) -> Result<bool, CatalogError> {
        match self {
            Self::InMemory(_) => Ok(false),
            Self::Persistent(store) => {
                store.compact()?;
                Ok(true)
            }
        }
    }

    /// Short backend name for status output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            Self::Persistent(_) => "redb",
        }
    }
}

impl CatalogStore for StorageBackend {
    fn scan_all(&self) -> Result<Vec<MediaRecord>, CatalogError> {
        match self {
            Self::InMemory(store) => store.scan_all(),
            Self::Persistent(store) => store.scan_all(),
        }
    }

    fn get(&self, id: &str) -> Result<Option<MediaRecord>, CatalogError> {
        match self {
            Self::InMemory(store) => store.get(id),
            Self::Persistent(store) => store.get(id),
        }
    }

    fn put(&mut self, record: MediaRecord) -> Result<(), CatalogError> {
        match self {
            Self::InMemory(store) => store.put(record),
            Self::Persistent(store) => store.put(record),
        }
    }

    fn update_tags(&mut self, id: &str, tags: &TagMap) -> Result<(), CatalogError> {
        match self {
            Self::InMemory(store) => store.update_tags(id, tags),
            Self::Persistent(store) => store.update_tags(id, tags),
        }
    }

    fn delete(&mut self, id: &str) -> Result<bool, CatalogError> {
        match self {
            Self::InMemory(store) => store.delete(id),
            Self::Persistent(store) => store.delete(id),
        }
    }

    fn record_count(&self) -> Result<usize, CatalogError> {
        match self {
            Self::InMemory(store) => store.record_count(),
            Self::Persistent(store) => store.record_count(),
        }
    }

    fn find_by_thumbnail(&self, link: &str) -> Result<Option<MediaRecord>, CatalogError> {
        match self {
            Self::InMemory(store) => store.find_by_thumbnail(link),
            Self::Persistent(store) => store.find_by_thumbnail(link),
        }
    }
}
