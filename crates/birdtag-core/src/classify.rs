//! # Classifier Seam
//!
//! Image classification is an external collaborator. The engine only needs
//! the species names a classifier sees in an image; it then answers the
//! image query with an all-present predicate over those names.

use crate::CatalogError;
use serde::{Deserialize, Serialize};

/// Infers species names from raw image bytes.
pub trait Classifier: Send + Sync {
    /// Species detected in the image. Order and duplicates are irrelevant.
    fn classify(&self, image: &[u8]) -> Result<Vec<String>, CatalogError>;
}

/// Result of a query by example image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageQueryResult {
    /// Species the classifier reported, deduplicated and sorted.
    pub inferred_tags: Vec<String>,
    /// Primary links of records carrying every inferred tag.
    pub links: Vec<String>,
}

/// Classifier returning a fixed answer for every image.
#[derive(Debug, Clone, Default)]
pub struct FixedClassifier {
    species: Vec<String>,
}

impl FixedClassifier {
    #[must_use]
    pub fn new<I, S>(species: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            species: species.into_iter().map(Into::into).collect(),
        }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, image: &[u8]) -> Result<Vec<String>, CatalogError> {
        if image.is_empty() {
            return Err(CatalogError::InvalidArgument("empty image".to_string()));
        }
        Ok(self.species.clone())
    }
}
