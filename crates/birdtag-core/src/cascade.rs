//! # Deletion Cascade
//!
//! Retiring a catalog entry removes its thumbnail and media blobs, then the
//! record itself. Blob deletions are independent, best-effort steps: each
//! failure is captured in the report and never stops the record delete.

use crate::blob::{BlobLocation, BlobStore};
use crate::mutation::ItemFailure;
use crate::primitives::MAX_BATCH_LINKS;
use crate::query::resolve_link;
use crate::store::CatalogStore;
use crate::{CatalogError, MediaRecord};
use serde::{Deserialize, Serialize};

/// A blob that could not be removed during a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobFailure {
    /// Id of the record the blob belonged to.
    pub record_id: String,
    pub url: String,
    pub error: String,
}

/// Outcome of a delete batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    /// Primary keys of records actually deleted.
    pub deleted: Vec<String>,
    /// Blobs left behind; their records were still deleted.
    pub blob_failures: Vec<BlobFailure>,
    /// Links whose resolution or record delete failed.
    pub failed: Vec<ItemFailure>,
}

/// Delete the thumbnail and media blobs of one record.
///
/// Returns one `BlobFailure` per blob that could not be removed.
pub fn delete_blobs(blobs: &dyn BlobStore, record: &MediaRecord) -> Vec<BlobFailure> {
    [record.thumbnail_url.as_str(), record.media_url.as_str()]
        .into_iter()
        .filter(|url| !url.is_empty())
        .filter_map(|url| {
            let result = BlobLocation::parse(url).and_then(|location| blobs.delete(&location));
            match result {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(record = %record.id, url, error = %e, "blob delete failed, continuing");
                    Some(BlobFailure {
                        record_id: record.id.clone(),
                        url: url.to_string(),
                        error: e.to_string(),
                    })
                }
            }
        })
        .collect()
}

/// Resolve each link and delete the record and its blobs.
///
/// Unresolved links are skipped without error.
pub fn delete_by_links<S: CatalogStore + ?Sized>(
    store: &mut S,
    blobs: &dyn BlobStore,
    links: &[String],
) -> Result<DeleteReport, CatalogError> {
    if links.len() > MAX_BATCH_LINKS {
        return Err(CatalogError::InvalidArgument(format!(
            "{} links exceeds maximum {}",
            links.len(),
            MAX_BATCH_LINKS
        )));
    }

    let mut report = DeleteReport::default();
    for link in links {
        let record = match resolve_link(&*store, link) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!(link = %link, "delete: no record for link");
                continue;
            }
            Err(e) => {
                tracing::warn!(link = %link, error = %e, "delete: resolution failed");
                report.failed.push(ItemFailure {
                    link: link.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        report.blob_failures.extend(delete_blobs(blobs, &record));

        match store.delete(&record.id) {
            Ok(true) => report.deleted.push(record.id),
            Ok(false) => {
                tracing::debug!(link = %link, id = %record.id, "delete: record already gone");
            }
            Err(e) => {
                tracing::warn!(link = %link, id = %record.id, error = %e, "delete: record delete failed");
                report.failed.push(ItemFailure {
                    link: link.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        deleted = report.deleted.len(),
        blob_failures = report.blob_failures.len(),
        failed = report.failed.len(),
        "delete finished"
    );
    Ok(report)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TagMap;
    use crate::blob::MemoryBlobStore;
    use crate::store::MemoryStore;

    /// Store that fails deletes of `failing` and reports `vanished` as
    /// already removed.
    struct FlakyStore {
        inner: MemoryStore,
        failing: &'static str,
        vanished: &'static str,
    }

    impl CatalogStore for FlakyStore {
        fn scan_all(&self) -> Result<Vec<MediaRecord>, CatalogError> {
            self.inner.scan_all()
        }

        fn get(&self, id: &str) -> Result<Option<MediaRecord>, CatalogError> {
            self.inner.get(id)
        }

        fn put(&mut self, record: MediaRecord) -> Result<(), CatalogError> {
            self.inner.put(record)
        }

        fn update_tags(&mut self, id: &str, tags: &TagMap) -> Result<(), CatalogError> {
            self.inner.update_tags(id, tags)
        }

        fn delete(&mut self, id: &str) -> Result<bool, CatalogError> {
            if id == self.failing {
                return Err(CatalogError::StoreFailure("boom".to_string()));
            }
            if id == self.vanished {
                return Ok(false);
            }
            self.inner.delete(id)
        }
    }

    /// Blob store whose deletes always fail.
    struct BrokenBlobs;

    impl BlobStore for BrokenBlobs {
        fn delete(&self, location: &BlobLocation) -> Result<(), CatalogError> {
            Err(CatalogError::BlobFailure(format!("{} unavailable", location)))
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    fn record(id: &str) -> MediaRecord {
        MediaRecord {
            id: id.to_string(),
            media_url: format!("https://media.s3.amazonaws.com/{}.jpg", id),
            thumbnail_url: format!("https://thumbs.s3.amazonaws.com/{}.jpg", id),
            tags: [("crow", 1)].into_iter().collect(),
            timestamp: String::new(),
            uploader: String::new(),
            file_type: String::new(),
        }
    }

    #[test]
    fn cascade_removes_blobs_and_record() {
        let mut store = MemoryStore::from_records([record("f1"), record("f2")]);
        let blobs = MemoryBlobStore::new();
        blobs.insert(BlobLocation::new("media", "f1.jpg"));
        blobs.insert(BlobLocation::new("thumbs", "f1.jpg"));
        blobs.insert(BlobLocation::new("media", "f2.jpg"));

        let report = delete_by_links(
            &mut store,
            &blobs,
            &["https://thumbs.s3.amazonaws.com/f1.jpg".to_string()],
        )
        .expect("delete");

        assert_eq!(report.deleted, vec!["f1"]);
        assert!(report.blob_failures.is_empty());
        assert!(store.get("f1").expect("get").is_none());
        assert!(store.get("f2").expect("get").is_some());
        assert_eq!(blobs.len(), 1);
        assert!(blobs.contains(&BlobLocation::new("media", "f2.jpg")));
    }

    #[test]
    fn blob_failures_do_not_block_record_delete() {
        let mut store = MemoryStore::from_records([record("f1")]);

        let report = delete_by_links(
            &mut store,
            &BrokenBlobs,
            &["https://thumbs.s3.amazonaws.com/f1.jpg".to_string()],
        )
        .expect("delete");

        assert_eq!(report.deleted, vec!["f1"]);
        assert_eq!(report.blob_failures.len(), 2);
        assert!(store.scan_all().expect("scan").is_empty());
    }

    #[test]
    fn unparseable_blob_url_is_captured() {
        let mut bad = record("f1");
        bad.media_url = "not a url".to_string();

        let failures = delete_blobs(&MemoryBlobStore::new(), &bad);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].url, "not a url");
    }

    #[test]
    fn unresolved_links_are_skipped() {
        let mut store = MemoryStore::from_records([record("f1")]);
        let report = delete_by_links(
            &mut store,
            &MemoryBlobStore::new(),
            &["https://thumbs.s3.amazonaws.com/zzz.jpg".to_string()],
        )
        .expect("delete");

        assert!(report.deleted.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(store.record_count().expect("count"), 1);
    }

    #[test]
    fn record_delete_failure_is_contained() {
        let mut store = FlakyStore {
            inner: MemoryStore::from_records([record("a"), record("b")]),
            failing: "a",
            vanished: "",
        };
        let links = [
            "https://thumbs.s3.amazonaws.com/a.jpg".to_string(),
            "https://thumbs.s3.amazonaws.com/b.jpg".to_string(),
        ];

        let report = delete_by_links(&mut store, &MemoryBlobStore::new(), &links).expect("delete");

        assert_eq!(report.deleted, vec!["b"]);
        assert_eq!(
            report.failed,
            vec![ItemFailure {
                link: links[0].clone(),
                error: "Store failure: boom".to_string(),
            }]
        );
        assert!(store.get("a").expect("get").is_some());
        assert!(store.get("b").expect("get").is_none());
    }

    #[test]
    fn already_removed_record_is_not_reported_deleted() {
        let mut store = FlakyStore {
            inner: MemoryStore::from_records([record("a"), record("b")]),
            failing: "",
            vanished: "a",
        };
        let links = [
            "https://thumbs.s3.amazonaws.com/a.jpg".to_string(),
            "https://thumbs.s3.amazonaws.com/b.jpg".to_string(),
        ];

        let report = delete_by_links(&mut store, &MemoryBlobStore::new(), &links).expect("delete");

        assert_eq!(report.deleted, vec!["b"]);
        assert!(report.failed.is_empty());
    }
}
