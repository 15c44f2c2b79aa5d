//! # Core Type Definitions
//!
//! This module contains the data model shared by every engine component:
//! - Catalog entries (`MediaRecord`) and their sparse tag counts (`TagMap`)
//! - Tag edit inputs (`EditOperation`, `AddPolicy`)
//! - Raw tag count input accepted on insert (`TagValue`)
//! - Error types (`CatalogError`)
//!
//! ## Canonical Tag Counts
//!
//! Tag counts are `u64`. A tag absent from a `TagMap` has count 0, and a
//! `TagMap` never stores a zero: constructing, deserializing, or setting a
//! zero count removes the key. Stores therefore never hand back zero-valued
//! entries on read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// TAG MAP
// =============================================================================

/// Sparse mapping from species name to a positive count.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct TagMap(BTreeMap<String, u64>);

impl TagMap {
    /// Create an empty tag map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for a tag, 0 when absent.
    #[must_use]
    pub fn count(&self, name: &str) -> u64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    /// Whether the tag is present as a key.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Set a tag count. A zero count removes the tag.
    pub fn set(&mut self, name: impl Into<String>, count: u64) {
        let name = name.into();
        if count == 0 {
            self.0.remove(&name);
        } else {
            self.0.insert(name, count);
        }
    }

    /// Add to a tag count with saturating arithmetic.
    pub fn increment(&mut self, name: impl Into<String>, by: u64) {
        let name = name.into();
        let next = self.count(&name).saturating_add(by);
        self.set(name, next);
    }

    /// Remove a tag. Returns `true` if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.0.remove(name).is_some()
    }

    /// Iterate over `(name, count)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Tag names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, u64>> for TagMap {
    fn from(mut map: BTreeMap<String, u64>) -> Self {
        map.retain(|_, count| *count > 0);
        Self(map)
    }
}

impl From<TagMap> for BTreeMap<String, u64> {
    fn from(tags: TagMap) -> Self {
        tags.0
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut tags = Self::new();
        for (name, count) in iter {
            tags.set(name, count);
        }
        tags
    }
}

// =============================================================================
// MEDIA RECORD
// =============================================================================

/// A catalog entry: one media item, its blobs, and its species tags.
///
/// Serialized field names follow the wire format clients already use
/// (`filename`, `s3_url`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Primary key. Immutable once inserted.
    #[serde(rename = "filename")]
    pub id: String,
    /// Link to the primary blob.
    #[serde(rename = "s3_url")]
    pub media_url: String,
    /// Link to the thumbnail blob; used as a secondary, non-unique lookup key.
    pub thumbnail_url: String,
    pub tags: TagMap,
    pub timestamp: String,
    pub uploader: String,
    pub file_type: String,
}

// =============================================================================
// TAG EDIT INPUTS
// =============================================================================

/// Direction of a tag edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOperation {
    Add,
    Remove,
}

impl EditOperation {
    /// Decode the numeric flag used on the wire: `1` adds, `0` removes.
    #[must_use]
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            1 => Some(Self::Add),
            0 => Some(Self::Remove),
            _ => None,
        }
    }
}

impl std::str::FromStr for EditOperation {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" | "1" => Ok(Self::Add),
            "remove" | "0" => Ok(Self::Remove),
            other => Err(CatalogError::InvalidArgument(format!(
                "unknown tag operation '{}'",
                other
            ))),
        }
    }
}

/// How `EditOperation::Add` combines a delta with an existing count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddPolicy {
    /// `tags[name] = count`
    #[default]
    Overwrite,
    /// `tags[name] = tags[name] + count`
    Increment,
}

impl fmt::Display for AddPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::Increment => write!(f, "increment"),
        }
    }
}

impl std::str::FromStr for AddPolicy {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "increment" => Ok(Self::Increment),
            other => Err(CatalogError::InvalidArgument(format!(
                "unknown add policy '{}' (expected overwrite or increment)",
                other
            ))),
        }
    }
}

// =============================================================================
// RAW TAG VALUES
// =============================================================================

/// A tag count as submitted by a client, before canonicalization.
///
/// Clients send plain integers, floats that happen to be integral (`2.0`),
/// or numeric strings. See `Ingestor::canonical_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors produced by the catalog engine and its collaborators.
///
/// - `InvalidArgument` is raised before the store is touched
/// - `StoreFailure` / `BlobFailure` come from collaborators
/// - No variant is ever retried
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Missing or malformed required input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A single-entity lookup matched nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The catalog store failed.
    #[error("Store failure: {0}")]
    StoreFailure(String),

    /// The blob store failed.
    #[error("Blob failure: {0}")]
    BlobFailure(String),

    /// A blob URL could not be split into bucket and key.
    #[error("Invalid blob URL: {0}")]
    InvalidBlobUrl(String),

    /// Encoding or decoding a stored record failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem or socket I/O outside the stores failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The operation needs a collaborator that is not configured.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl CatalogError {
    /// Wrap any displayable store error.
    pub fn store(e: impl fmt::Display) -> Self {
        Self::StoreFailure(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
