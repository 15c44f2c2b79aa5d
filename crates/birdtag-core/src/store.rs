//! # Catalog Store
//!
//! The keyed record store the engine reads snapshots from and writes back to.
//!
//! The store is deliberately unindexed: the only query path is `scan_all`,
//! and link resolution defaults to a first-match scan. A store that keeps a
//! secondary index can override `find_by_thumbnail` without changing what
//! the engine's predicates mean.

use crate::{CatalogError, MediaRecord, TagMap};
use std::collections::BTreeMap;

// =============================================================================
// CATALOGSTORE TRAIT
// =============================================================================

/// Keyed record store collaborator.
///
/// All fallible operations return `Result<T, CatalogError>` so in-memory and
/// persistent backends are interchangeable.
pub trait CatalogStore {
    /// Snapshot of every record. Order is backend-defined and not stable
    /// across calls.
    fn scan_all(&self) -> Result<Vec<MediaRecord>, CatalogError>;

    /// Point lookup by primary key.
    fn get(&self, id: &str) -> Result<Option<MediaRecord>, CatalogError>;

    /// Write a record unconditionally. An existing record with the same id
    /// is replaced.
    fn put(&mut self, record: MediaRecord) -> Result<(), CatalogError>;

    /// Replace the whole tag map of an existing record.
    ///
    /// Returns `CatalogError::NotFound` if no record has this id.
    fn update_tags(&mut self, id: &str, tags: &TagMap) -> Result<(), CatalogError>;

    /// Delete by primary key. Returns `true` if a record was removed.
    fn delete(&mut self, id: &str) -> Result<bool, CatalogError>;

    /// Number of records.
    fn record_count(&self) -> Result<usize, CatalogError> {
        Ok(self.scan_all()?.len())
    }

    /// First record whose `thumbnail_url` equals `link`, in scan order.
    ///
    /// Duplicate thumbnails are a store anomaly; later matches are ignored.
    fn find_by_thumbnail(&self, link: &str) -> Result<Option<MediaRecord>, CatalogError> {
        Ok(self
            .scan_all()?
            .into_iter()
            .find(|record| record.thumbnail_url == link))
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-process catalog keyed by record id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, MediaRecord>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding the given records. Later duplicates win.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = MediaRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        }
    }
}

impl CatalogStore for MemoryStore {
    fn scan_all(&self) -> Result<Vec<MediaRecord>, CatalogError> {
        Ok(self.records.values().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<MediaRecord>, CatalogError> {
        Ok(self.records.get(id).cloned())
    }

    fn put(&mut self, record: MediaRecord) -> Result<(), CatalogError> {
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    fn update_tags(&mut self, id: &str, tags: &TagMap) -> Result<(), CatalogError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| CatalogError::NotFound(format!("record '{}'", id)))?;
        record.tags = tags.clone();
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<bool, CatalogError> {
        Ok(self.records.remove(id).is_some())
    }

    fn record_count(&self) -> Result<usize, CatalogError> {
        Ok(self.records.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
