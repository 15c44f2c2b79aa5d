//! # Blob Store
//!
//! Object storage for the media and thumbnail files a record points at.
//!
//! The engine only ever deletes blobs, and only on a best-effort basis.
//! Links are parsed into a `BlobLocation` (bucket + key). Two URL forms are
//! understood:
//!
//! ```text
//! https://<bucket>.s3.<region>.amazonaws.com/<key...>
//! s3://<bucket>/<key...>
//! ```

use crate::CatalogError;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

// =============================================================================
// BLOB LOCATION
// =============================================================================

/// Bucket and key of one stored object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobLocation {
    pub bucket: String,
    pub key: String,
}

impl BlobLocation {
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Split a blob URL into bucket and key.
    ///
    /// For virtual-hosted URLs the bucket is the first label of the host.
    pub fn parse(url: &str) -> Result<Self, CatalogError> {
        let invalid = || CatalogError::InvalidBlobUrl(url.to_string());

        let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
        let (host, key) = rest.split_once('/').ok_or_else(invalid)?;

        let bucket = if scheme.eq_ignore_ascii_case("s3") {
            host
        } else {
            host.split('.').next().unwrap_or_default()
        };

        if bucket.is_empty() || key.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(bucket, key))
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

// =============================================================================
// BLOBSTORE TRAIT
// =============================================================================

/// Object store collaborator.
pub trait BlobStore: Send + Sync {
    /// Delete an object. Deleting an object that does not exist succeeds.
    fn delete(&self, location: &BlobLocation) -> Result<(), CatalogError>;

    /// Backend name for status output.
    fn backend_name(&self) -> &'static str;
}

// =============================================================================
// LOCAL FILESYSTEM BLOB STORE
// =============================================================================

/// Blob store rooted at a directory; objects live at `root/bucket/key`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            CatalogError::BlobFailure(format!(
                "failed to create blob root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a location to a path under the root.
    ///
    /// Bucket and key may only contain normal path components, so a location
    /// can never resolve outside the root.
    pub fn path_for(&self, location: &BlobLocation) -> Result<PathBuf, CatalogError> {
        let relative = Path::new(&location.bucket).join(&location.key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || location.bucket.contains('/') {
            return Err(CatalogError::InvalidBlobUrl(location.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for LocalBlobStore {
    fn delete(&self, location: &BlobLocation) -> Result<(), CatalogError> {
        let path = self.path_for(location)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CatalogError::BlobFailure(format!(
                "failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

// =============================================================================
// IN-MEMORY BLOB STORE
// =============================================================================

/// Blob store that only tracks which objects exist.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeSet<BlobLocation>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object.
    pub fn insert(&self, location: BlobLocation) {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(location);
    }

    #[must_use]
    pub fn contains(&self, location: &BlobLocation) -> bool {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(location)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn delete(&self, location: &BlobLocation) -> Result<(), CatalogError> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(location);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_virtual_hosted_url() {
        let loc = BlobLocation::parse("https://bird-media.s3.amazonaws.com/images/crow_1.jpg")
            .expect("parse");
        assert_eq!(loc, BlobLocation::new("bird-media", "images/crow_1.jpg"));
    }

    #[test]
    fn parse_regional_url() {
        let loc = BlobLocation::parse(
            "https://bird-thumbs.s3.ap-southeast-2.amazonaws.com/thumbs/crow_1.jpg",
        )
        .expect("parse");
        assert_eq!(loc.bucket, "bird-thumbs");
        assert_eq!(loc.key, "thumbs/crow_1.jpg");
    }

    #[test]
    fn parse_s3_scheme() {
        let loc = BlobLocation::parse("s3://bird-media/a/b.mp4").expect("parse");
        assert_eq!(loc, BlobLocation::new("bird-media", "a/b.mp4"));
        assert_eq!(loc.to_string(), "s3://bird-media/a/b.mp4");
    }

    #[test]
    fn parse_rejects_incomplete_urls() {
        for url in ["", "bird-media/a.jpg", "https://bucket.s3.amazonaws.com", "https://bucket/", "s3:///key"] {
            assert!(
                matches!(BlobLocation::parse(url), Err(CatalogError::InvalidBlobUrl(_))),
                "expected '{}' to be rejected",
                url
            );
        }
    }

    #[test]
    fn local_store_deletes_file() {
        let temp = tempdir().expect("temp dir");
        let store = LocalBlobStore::new(temp.path()).expect("store");
        let loc = BlobLocation::new("media", "images/crow.jpg");

        let path = store.path_for(&loc).expect("path");
        assert!(path.starts_with(store.root()));
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, b"jpeg").expect("write");

        store.delete(&loc).expect("delete");
        assert!(!path.exists());
        // Second delete of a missing object succeeds
        store.delete(&loc).expect("delete again");
    }

    #[test]
    fn local_store_rejects_traversal() {
        let temp = tempdir().expect("temp dir");
        let store = LocalBlobStore::new(temp.path()).expect("store");

        let loc = BlobLocation::new("media", "../../etc/passwd");
        assert!(matches!(
            store.delete(&loc),
            Err(CatalogError::InvalidBlobUrl(_))
        ));
    }

    #[test]
    fn memory_store_tracks_objects() {
        let store = MemoryBlobStore::new();
        let loc = BlobLocation::new("media", "a.jpg");
        store.insert(loc.clone());
        assert!(store.contains(&loc));

        store.delete(&loc).expect("delete");
        assert!(store.is_empty());
    }
}
