//! # Mutation Engine
//!
//! Read-modify-write tag edits.
//!
//! Each target link is resolved to a record, the deltas are merged into a
//! working copy of its tag map, and the whole map is written back with a
//! single `update_tags` call. There is no compare-and-swap: two writers
//! editing the same record concurrently through separate store handles can
//! lose one update (last writer wins on the whole map).

use crate::primitives::{MAX_BATCH_LINKS, MAX_TAG_NAME_LENGTH, TAG_DELTA_SEPARATOR};
use crate::query::resolve_link;
use crate::store::CatalogStore;
use crate::{AddPolicy, CatalogError, EditOperation, TagMap};
use serde::{Deserialize, Serialize};

// =============================================================================
// TAG DELTAS
// =============================================================================

/// One parsed `"name,count"` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDelta {
    pub name: String,
    pub count: u64,
}

impl TagDelta {
    #[must_use]
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }

    /// Parse `"name,count"`. Surrounding whitespace on either part is ignored.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let malformed = || CatalogError::InvalidArgument(format!("malformed tag delta '{}'", raw));

        let (name, count) = raw.split_once(TAG_DELTA_SEPARATOR).ok_or_else(malformed)?;
        if count.contains(TAG_DELTA_SEPARATOR) {
            return Err(malformed());
        }

        let name = name.trim();
        if name.is_empty() || name.len() > MAX_TAG_NAME_LENGTH {
            return Err(malformed());
        }
        let count: u64 = count.trim().parse().map_err(|_| malformed())?;

        Ok(Self::new(name, count))
    }
}

/// Parse every delta, dropping malformed entries.
pub fn parse_deltas<S: AsRef<str>>(raw: &[S]) -> Vec<TagDelta> {
    raw.iter()
        .filter_map(|entry| match TagDelta::parse(entry.as_ref()) {
            Ok(delta) => Some(delta),
            Err(e) => {
                tracing::warn!(entry = entry.as_ref(), error = %e, "dropping tag delta");
                None
            }
        })
        .collect()
}

// =============================================================================
// EDIT REPORT
// =============================================================================

/// A per-item failure that did not abort the surrounding batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub link: String,
    pub error: String,
}

/// Outcome of a tag edit batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditReport {
    /// Links that resolved and were written back.
    pub updated: Vec<String>,
    /// Links that resolved to no record.
    pub skipped: Vec<String>,
    /// Links whose resolution or write failed.
    pub failed: Vec<ItemFailure>,
}

// =============================================================================
// MUTATION ENGINE
// =============================================================================

/// Tag merge rules.
pub struct MutationEngine;

impl MutationEngine {
    /// Merge deltas into a copy of `tags`.
    ///
    /// - `Add` + `Overwrite`: `tags[name] = count`
    /// - `Add` + `Increment`: `tags[name] += count` (saturating)
    /// - `Remove`: drop the key; the count is ignored
    ///
    /// A resulting zero removes the key.
    #[must_use]
    pub fn apply(
        tags: &TagMap,
        deltas: &[TagDelta],
        operation: EditOperation,
        policy: AddPolicy,
    ) -> TagMap {
        let mut merged = tags.clone();
        for delta in deltas {
            match (operation, policy) {
                (EditOperation::Add, AddPolicy::Overwrite) => {
                    merged.set(delta.name.clone(), delta.count);
                }
                (EditOperation::Add, AddPolicy::Increment) => {
                    merged.increment(delta.name.clone(), delta.count);
                }
                (EditOperation::Remove, _) => {
                    merged.remove(&delta.name);
                }
            }
        }
        merged
    }

    /// Apply deltas to every record resolved from `links`.
    ///
    /// Unresolved links are skipped silently. A store failure on one link is
    /// recorded and the remaining links are still processed.
    pub fn edit_tags<S: CatalogStore + ?Sized>(
        store: &mut S,
        links: &[String],
        deltas: &[TagDelta],
        operation: EditOperation,
        policy: AddPolicy,
    ) -> Result<EditReport, CatalogError> {
        if links.len() > MAX_BATCH_LINKS {
            return Err(CatalogError::InvalidArgument(format!(
                "{} links exceeds maximum {}",
                links.len(),
                MAX_BATCH_LINKS
            )));
        }

        let mut report = EditReport::default();
        for link in links {
            let record = match resolve_link(&*store, link) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    tracing::debug!(link = %link, "tag edit: no record for link");
                    report.skipped.push(link.clone());
                    continue;
                }
                Err(e) => {
                    tracing::warn!(link = %link, error = %e, "tag edit: resolution failed");
                    report.failed.push(ItemFailure {
                        link: link.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let merged = Self::apply(&record.tags, deltas, operation, policy);
            match store.update_tags(&record.id, &merged) {
                Ok(()) => report.updated.push(link.clone()),
                Err(e) => {
                    tracing::warn!(link = %link, id = %record.id, error = %e, "tag edit: write failed");
                    report.failed.push(ItemFailure {
                        link: link.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            ?operation,
            %policy,
            "tag edit finished"
        );
        Ok(report)
    }
}

// =============================================================================
// TESTS
// =============================================================================
