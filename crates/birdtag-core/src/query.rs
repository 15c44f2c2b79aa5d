//! # Query Module
//!
//! Tag predicates evaluated over a full catalog snapshot.
//!
//! - `ThresholdAll`: every constrained tag meets its minimum count
//! - `AnyPresent`: at least one requested tag is a key of the record
//! - `AllPresent`: every requested tag is a key of the record
//!
//! Predicates are pure. `run_predicate` and `resolve_link` only read.

use crate::primitives::{MAX_LINK_LENGTH, MAX_QUERY_TAGS};
use crate::store::CatalogStore;
use crate::{CatalogError, MediaRecord};
use std::collections::{BTreeMap, BTreeSet};

/// Tag predicate over a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `record.tags.count(k) >= min` for every `(k, min)`.
    ThresholdAll(BTreeMap<String, u64>),
    /// At least one tag is present as a key.
    AnyPresent(BTreeSet<String>),
    /// Every tag is present as a key.
    AllPresent(BTreeSet<String>),
}

impl Predicate {
    /// Threshold predicate. Rejects an empty constraint set.
    pub fn threshold_all<I, S>(constraints: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let constraints: BTreeMap<String, u64> = constraints
            .into_iter()
            .map(|(name, min)| (name.into(), min))
            .collect();
        Self::check_size(constraints.len())?;
        Ok(Self::ThresholdAll(constraints))
    }

    /// Any-match predicate. Rejects an empty tag set.
    pub fn any_present<I, S>(tags: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        Self::check_size(tags.len())?;
        Ok(Self::AnyPresent(tags))
    }

    /// All-present predicate. Rejects an empty tag set.
    pub fn all_present<I, S>(tags: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        Self::check_size(tags.len())?;
        Ok(Self::AllPresent(tags))
    }

    fn check_size(len: usize) -> Result<(), CatalogError> {
        if len == 0 {
            return Err(CatalogError::InvalidArgument("Missing tags".to_string()));
        }
        if len > MAX_QUERY_TAGS {
            return Err(CatalogError::InvalidArgument(format!(
                "query names {} tags, maximum is {}",
                len, MAX_QUERY_TAGS
            )));
        }
        Ok(())
    }

    /// Evaluate against one record.
    #[must_use]
    pub fn matches(&self, record: &MediaRecord) -> bool {
        match self {
            Self::ThresholdAll(constraints) => constraints
                .iter()
                .all(|(name, min)| record.tags.count(name) >= *min),
            Self::AnyPresent(tags) => tags.iter().any(|tag| record.tags.contains(tag)),
            Self::AllPresent(tags) => tags.iter().all(|tag| record.tags.contains(tag)),
        }
    }

    /// Whether records with an empty primary link are dropped from results.
    ///
    /// Threshold results emit the link as stored.
    fn skips_empty_links(&self) -> bool {
        !matches!(self, Self::ThresholdAll(_))
    }
}

/// Primary links of every matching record, in scan order.
///
/// A scan failure is not recoverable here and surfaces to the caller.
pub fn run_predicate<S: CatalogStore + ?Sized>(
    store: &S,
    predicate: &Predicate,
) -> Result<Vec<String>, CatalogError> {
    let skip_empty = predicate.skips_empty_links();
    Ok(store
        .scan_all()?
        .into_iter()
        .filter(|record| predicate.matches(record))
        .filter(|record| !(skip_empty && record.media_url.is_empty()))
        .map(|record| record.media_url)
        .collect())
}

/// Validate a link supplied by a caller.
pub fn validate_link(link: &str) -> Result<(), CatalogError> {
    if link.is_empty() {
        return Err(CatalogError::InvalidArgument("Missing thumbnail".to_string()));
    }
    if link.len() > MAX_LINK_LENGTH {
        return Err(CatalogError::InvalidArgument(format!(
            "link length {} exceeds maximum {}",
            link.len(),
            MAX_LINK_LENGTH
        )));
    }
    Ok(())
}

/// Resolve a record by its thumbnail link, first match wins.
///
/// No match is `Ok(None)`, not an error.
pub fn resolve_link<S: CatalogStore + ?Sized>(
    store: &S,
    link: &str,
) -> Result<Option<MediaRecord>, CatalogError> {
    validate_link(link)?;
    store.find_by_thumbnail(link)
}

// =============================================================================
// TESTS
// =============================================================================
