//! # Catalog Engine
//!
//! `CatalogEngine` owns an injected catalog store, a blob store handle, and
//! its configuration, and exposes the catalog operations:
//!
//! | Operation | Reads | Writes |
//! |---|---|---|
//! | `search` | full scan | - |
//! | `fuzzy` | full scan | - |
//! | `thumbnail` | link resolution | - |
//! | `edit_tags` | link resolution | `update_tags` per record |
//! | `delete` | link resolution | blobs, then `delete` per record |
//! | `insert` | - | `put` |
//! | `search_by_image` | full scan | - |
//!
//! The engine keeps no state of its own beyond these handles.

use crate::backend::StorageBackend;
use crate::blob::{BlobStore, MemoryBlobStore};
use crate::cascade::{DeleteReport, delete_by_links};
use crate::classify::{Classifier, ImageQueryResult};
use crate::config::EngineConfig;
use crate::ingestor::{Ingestor, NewRecord};
use crate::mutation::{EditReport, MutationEngine, parse_deltas};
use crate::query::{Predicate, resolve_link, run_predicate};
use crate::store::CatalogStore;
use crate::{CatalogError, EditOperation, MediaRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Catalog summary for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStatus {
    pub records: usize,
    /// Distinct tag names across all records.
    pub distinct_tags: usize,
    pub backend: String,
    pub blob_backend: String,
    pub add_policy: String,
}

/// The tag query and mutation engine.
pub struct CatalogEngine<S: CatalogStore = StorageBackend> {
    store: S,
    blobs: Arc<dyn BlobStore>,
    config: EngineConfig,
}

impl<S: CatalogStore + std::fmt::Debug> std::fmt::Debug for CatalogEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEngine")
            .field("store", &self.store)
            .field("blobs", &self.blobs.backend_name())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for CatalogEngine<StorageBackend> {
    fn default() -> Self {
        Self::new(
            StorageBackend::default(),
            Arc::new(MemoryBlobStore::new()),
            EngineConfig::default(),
        )
    }
}

impl<S: CatalogStore> CatalogEngine<S> {
    /// Create an engine over the given collaborators.
    pub fn new(store: S, blobs: Arc<dyn BlobStore>, config: EngineConfig) -> Self {
        Self {
            store,
            blobs,
            config,
        }
    }

    /// The underlying catalog store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying catalog store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn blob_store(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Links of records meeting every `tag >= min` constraint.
    pub fn search(&self, constraints: BTreeMap<String, u64>) -> Result<Vec<String>, CatalogError> {
        let predicate = Predicate::threshold_all(constraints)?;
        let links = run_predicate(&self.store, &predicate)?;
        tracing::debug!(matches = links.len(), "search");
        Ok(links)
    }

    /// Links of records carrying at least one of `tags`.
    pub fn fuzzy<I, T>(&self, tags: I) -> Result<Vec<String>, CatalogError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let predicate = Predicate::any_present(tags)?;
        let links = run_predicate(&self.store, &predicate)?;
        tracing::debug!(matches = links.len(), "fuzzy search");
        Ok(links)
    }

    /// Record whose thumbnail link equals `link`, if any.
    pub fn thumbnail(&self, link: &str) -> Result<Option<MediaRecord>, CatalogError> {
        resolve_link(&self.store, link)
    }

    /// Every record, in scan order.
    pub fn list(&self) -> Result<Vec<MediaRecord>, CatalogError> {
        self.store.scan_all()
    }

    /// Classify an image and find records carrying every inferred species.
    ///
    /// A classifier that sees nothing yields empty links rather than the
    /// whole catalog.
    pub fn search_by_image(
        &self,
        classifier: &dyn Classifier,
        image: &[u8],
    ) -> Result<ImageQueryResult, CatalogError> {
        let inferred: BTreeSet<String> = classifier
            .classify(image)?
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if inferred.is_empty() {
            tracing::info!("image query: classifier found no species");
            return Ok(ImageQueryResult::default());
        }

        let predicate = Predicate::all_present(inferred.iter().cloned())?;
        let links = run_predicate(&self.store, &predicate)?;
        tracing::info!(species = inferred.len(), matches = links.len(), "image query");
        Ok(ImageQueryResult {
            inferred_tags: inferred.into_iter().collect(),
            links,
        })
    }

    /// Record count, distinct tags, and backend names.
    pub fn status(&self, backend: &str) -> Result<CatalogStatus, CatalogError> {
        let records = self.store.scan_all()?;
        let distinct: BTreeSet<&str> = records.iter().flat_map(|r| r.tags.names()).collect();
        Ok(CatalogStatus {
            records: records.len(),
            distinct_tags: distinct.len(),
            backend: backend.to_string(),
            blob_backend: self.blobs.backend_name().to_string(),
            add_policy: self.config.add_policy.to_string(),
        })
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Apply `"name,count"` deltas to every record resolved from `links`.
    pub fn edit_tags<T: AsRef<str>>(
        &mut self,
        links: &[String],
        raw_deltas: &[T],
        operation: EditOperation,
    ) -> Result<EditReport, CatalogError> {
        let deltas = parse_deltas(raw_deltas);
        MutationEngine::edit_tags(
            &mut self.store,
            links,
            &deltas,
            operation,
            self.config.add_policy,
        )
    }

    /// Delete the records resolved from `links` along with their blobs.
    pub fn delete(&mut self, links: &[String]) -> Result<DeleteReport, CatalogError> {
        delete_by_links(&mut self.store, self.blobs.as_ref(), links)
    }

    /// Validate and write a new record. Returns its id.
    pub fn insert(&mut self, new: NewRecord) -> Result<String, CatalogError> {
        Ingestor::ingest(&mut self.store, new)
    }
}

impl CatalogEngine<StorageBackend> {
    /// Status using the backend's own name.
    pub fn backend_status(&self) -> Result<CatalogStatus, CatalogError> {
        self.status(self.store.name())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FixedClassifier;
    use crate::store::MemoryStore;

    fn engine() -> CatalogEngine<MemoryStore> {
        let record = MediaRecord {
            id: "f1".to_string(),
            media_url: "m1".to_string(),
            thumbnail_url: "u1".to_string(),
            tags: [("crow", 2), ("pigeon", 1)].into_iter().collect(),
            timestamp: String::new(),
            uploader: String::new(),
            file_type: String::new(),
        };
        CatalogEngine::new(
            MemoryStore::from_records([record]),
            Arc::new(MemoryBlobStore::new()),
            EngineConfig::default(),
        )
    }

    #[test]
    fn search_and_fuzzy() {
        let engine = engine();
        assert_eq!(
            engine
                .search(BTreeMap::from([("crow".to_string(), 2)]))
                .expect("search"),
            vec!["m1"]
        );
        assert_eq!(engine.fuzzy(["sparrow", "crow"]).expect("fuzzy"), vec!["m1"]);
        assert!(engine.fuzzy(Vec::<String>::new()).is_err());
    }

    #[test]
    fn image_query_uses_all_present() {
        let engine = engine();

        let both = engine
            .search_by_image(&FixedClassifier::new(["crow", "pigeon", "crow"]), b"img")
            .expect("query");
        assert_eq!(both.inferred_tags, vec!["crow", "pigeon"]);
        assert_eq!(both.links, vec!["m1"]);

        let none = engine
            .search_by_image(&FixedClassifier::new(["crow", "owl"]), b"img")
            .expect("query");
        assert!(none.links.is_empty());
    }

    #[test]
    fn image_query_with_no_species_is_empty() {
        let engine = engine();
        let result = engine
            .search_by_image(&FixedClassifier::new(Vec::<String>::new()), b"img")
            .expect("query");
        assert_eq!(result, ImageQueryResult::default());
    }

    #[test]
    fn status_counts_distinct_tags() {
        let engine = engine();
        assert_eq!(engine.config().add_policy, crate::AddPolicy::Overwrite);
        assert_eq!(engine.blob_store().backend_name(), "memory");

        let status = engine.status("memory").expect("status");
        assert_eq!(status.records, 1);
        assert_eq!(status.distinct_tags, 2);
        assert_eq!(status.add_policy, "overwrite");
        assert_eq!(status.blob_backend, "memory");
    }
}
