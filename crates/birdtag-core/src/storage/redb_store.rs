//! # redb-backed Catalog Storage
//!
//! A disk-backed catalog store using the redb embedded database.
//!
//! Records are postcard-encoded and keyed by their primary id. redb gives:
//! - ACID write transactions (one per mutation)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC: each scan runs in its own read transaction and is consistent
//!   with itself, but two scans may observe different states
//!
//! There is no secondary index on `thumbnail_url`; link resolution uses the
//! trait's first-match scan.

use crate::store::CatalogStore;
use crate::{CatalogError, MediaRecord, TagMap};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for records: id -> postcard-encoded `MediaRecord`
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// A disk-backed catalog store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

fn encode(record: &MediaRecord) -> Result<Vec<u8>, CatalogError> {
    postcard::to_allocvec(record).map_err(|e| CatalogError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<MediaRecord, CatalogError> {
    postcard::from_bytes(bytes).map_err(|e| CatalogError::Serialization(e.to_string()))
}

impl RedbStore {
    /// Open or create a catalog database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let db = Database::create(path.as_ref()).map_err(CatalogError::store)?;

        // Create the table up front so read transactions never see it missing
        {
            let write_txn = db.begin_write().map_err(CatalogError::store)?;
            let _ = write_txn.open_table(RECORDS).map_err(CatalogError::store)?;
            write_txn.commit().map_err(CatalogError::store)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), CatalogError> {
        self.db.compact().map_err(CatalogError::store)?;
        Ok(())
    }
}

// =============================================================================
// CATALOGSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl CatalogStore for RedbStore {
    fn scan_all(&self) -> Result<Vec<MediaRecord>, CatalogError> {
        let read_txn = self.db.begin_read().map_err(CatalogError::store)?;
        let table = read_txn.open_table(RECORDS).map_err(CatalogError::store)?;

        let mut records = Vec::new();
        for entry in table.iter().map_err(CatalogError::store)? {
            let (_, value) = entry.map_err(CatalogError::store)?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }

    fn get(&self, id: &str) -> Result<Option<MediaRecord>, CatalogError> {
        let read_txn = self.db.begin_read().map_err(CatalogError::store)?;
        let table = read_txn.open_table(RECORDS).map_err(CatalogError::store)?;

        match table.get(id).map_err(CatalogError::store)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn put(&mut self, record: MediaRecord) -> Result<(), CatalogError> {
        let bytes = encode(&record)?;

        let write_txn = self.db.begin_write().map_err(CatalogError::store)?;
        {
            let mut table = write_txn.open_table(RECORDS).map_err(CatalogError::store)?;
            table
                .insert(record.id.as_str(), bytes.as_slice())
                .map_err(CatalogError::store)?;
        }
        write_txn.commit().map_err(CatalogError::store)?;
        Ok(())
    }

    fn update_tags(&mut self, id: &str, tags: &TagMap) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write().map_err(CatalogError::store)?;
        {
            let mut table = write_txn.open_table(RECORDS).map_err(CatalogError::store)?;

            // Read-modify-write of the tags attribute inside one transaction.
            let mut record = match table.get(id).map_err(CatalogError::store)? {
                Some(data) => decode(data.value())?,
                None => return Err(CatalogError::NotFound(format!("record '{}'", id))),
            };
            record.tags = tags.clone();

            let bytes = encode(&record)?;
            table
                .insert(id, bytes.as_slice())
                .map_err(CatalogError::store)?;
        }
        write_txn.commit().map_err(CatalogError::store)?;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<bool, CatalogError> {
        let write_txn = self.db.begin_write().map_err(CatalogError::store)?;
        let removed = {
            let mut table = write_txn.open_table(RECORDS).map_err(CatalogError::store)?;
            table.remove(id).map_err(CatalogError::store)?.is_some()
        };
        write_txn.commit().map_err(CatalogError::store)?;
        Ok(removed)
    }

    fn record_count(&self) -> Result<usize, CatalogError> {
        let read_txn = self.db.begin_read().map_err(CatalogError::store)?;
        let table = read_txn.open_table(RECORDS).map_err(CatalogError::store)?;
        let count = table.len().map_err(CatalogError::store)?;
        Ok(count as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
