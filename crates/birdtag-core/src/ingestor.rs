//! # Ingestor Module
//!
//! Validation and canonicalization for new catalog entries.
//!
//! - Reject entries with any required field missing
//! - Reduce submitted tag counts to canonical `u64` values
//! - Drop zero counts
//! - Write unconditionally (a duplicate id overwrites)

use crate::primitives::{MAX_LINK_LENGTH, MAX_TAG_NAME_LENGTH};
use crate::store::CatalogStore;
use crate::{CatalogError, MediaRecord, TagMap, TagValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entry as submitted for insertion. Every field is optional on input so
/// that a missing field is reported by name instead of as a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(rename = "filename", default)]
    pub id: Option<String>,
    #[serde(rename = "s3_url", default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, TagValue>>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Insert validation and ingestion.
pub struct Ingestor;

impl Ingestor {
    /// Validate a submitted entry and convert it to a `MediaRecord`.
    ///
    /// Identifiers (`filename`, `s3_url`, `thumbnail_url`) must be present
    /// and non-empty; the remaining fields only need to be present.
    pub fn validate(new: NewRecord) -> Result<MediaRecord, CatalogError> {
        let id = Self::required_link("filename", new.id)?;
        let media_url = Self::required_link("s3_url", new.media_url)?;
        let thumbnail_url = Self::required_link("thumbnail_url", new.thumbnail_url)?;
        let raw_tags = Self::required("tags", new.tags)?;
        let timestamp = Self::required("timestamp", new.timestamp)?;
        let uploader = Self::required("uploader", new.uploader)?;
        let file_type = Self::required("file_type", new.file_type)?;

        let mut tags = TagMap::new();
        for (name, value) in &raw_tags {
            let name = name.trim();
            if name.is_empty() || name.len() > MAX_TAG_NAME_LENGTH {
                return Err(CatalogError::InvalidArgument(format!(
                    "invalid tag name '{}'",
                    name
                )));
            }
            tags.set(name, Self::canonical_count(value)?);
        }

        Ok(MediaRecord {
            id,
            media_url,
            thumbnail_url,
            tags,
            timestamp,
            uploader,
            file_type,
        })
    }

    /// Reduce a submitted count to a `u64`.
    ///
    /// Accepts non-negative integers, integral floats (`2.0`), and strings
    /// holding either. Anything negative, fractional, or non-numeric is
    /// rejected.
    pub fn canonical_count(value: &TagValue) -> Result<u64, CatalogError> {
        let invalid = || CatalogError::InvalidArgument(format!("invalid tag count {:?}", value));

        match value {
            TagValue::Unsigned(n) => Ok(*n),
            TagValue::Signed(n) => u64::try_from(*n).map_err(|_| invalid()),
            TagValue::Float(f) => Self::integral_float(*f).ok_or_else(invalid),
            TagValue::Text(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<u64>() {
                    return Ok(n);
                }
                s.parse::<f64>()
                    .ok()
                    .and_then(Self::integral_float)
                    .ok_or_else(invalid)
            }
        }
    }

    /// An integral, non-negative float as `u64`.
    ///
    /// `f64`'s shortest round-trip rendering of an integral value has no
    /// fractional part, so parsing it back as `u64` accepts exactly the
    /// integral values that fit.
    fn integral_float(f: f64) -> Option<u64> {
        if !f.is_finite() || f.is_sign_negative() {
            return None;
        }
        f.to_string().parse::<u64>().ok()
    }

    /// Validate and write a new entry.
    ///
    /// Returns the id written.
    pub fn ingest<S: CatalogStore + ?Sized>(
        store: &mut S,
        new: NewRecord,
    ) -> Result<String, CatalogError> {
        let record = Self::validate(new)?;
        let id = record.id.clone();
        let tag_count = record.tags.len();
        store.put(record)?;
        tracing::info!(id = %id, tags = tag_count, "record inserted");
        Ok(id)
    }

    fn required<T>(field: &str, value: Option<T>) -> Result<T, CatalogError> {
        value.ok_or_else(|| {
            CatalogError::InvalidArgument(format!("Missing required field: {}", field))
        })
    }

    fn required_link(field: &str, value: Option<String>) -> Result<String, CatalogError> {
        let value = Self::required(field, value)?;
        if value.is_empty() {
            return Err(CatalogError::InvalidArgument(format!(
                "Missing required field: {}",
                field
            )));
        }
        if value.len() > MAX_LINK_LENGTH {
            return Err(CatalogError::InvalidArgument(format!(
                "{} exceeds maximum length {}",
                field, MAX_LINK_LENGTH
            )));
        }
        Ok(value)
    }
}

// =============================================================================
// TESTS
// =============================================================================
