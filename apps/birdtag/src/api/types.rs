//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Requests are a single document discriminated by `action`. Parameter
//! shapes follow what existing clients send: search minimums may be plain
//! numbers, numeric strings, or the typed `{"N": "2"}` form, and the tag
//! edit operation may be `1`/`0` or `"add"`/`"remove"`.

use birdtag_core::{
    BlobFailure, CatalogError, EditOperation, ImageQueryResult, Ingestor, NewRecord, TagValue,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every action the endpoint understands.
pub const ACTIONS: [&str; 7] = [
    "search",
    "fuzzy",
    "thumbnail",
    "tag_edit",
    "delete",
    "insert",
    "upload_query",
];

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Catalog status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub records: usize,
    pub distinct_tags: usize,
    pub backend: String,
    pub blob_backend: String,
    pub add_policy: String,
    pub classifier: bool,
}

// =============================================================================
// ACTION REQUEST
// =============================================================================

/// A search minimum in any of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountParam {
    /// `{"N": "2"}`
    Typed {
        #[serde(rename = "N")]
        n: TagValue,
    },
    /// `2`, `"2"`, `2.0`
    Plain(TagValue),
}

impl CountParam {
    pub fn to_count(&self) -> Result<u64, CatalogError> {
        match self {
            Self::Typed { n } | Self::Plain(n) => Ingestor::canonical_count(n),
        }
    }
}

/// The tag edit direction as `1`/`0` or `"add"`/`"remove"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationParam {
    Flag(i64),
    Name(String),
}

impl OperationParam {
    pub fn to_operation(&self) -> Result<EditOperation, CatalogError> {
        match self {
            Self::Flag(flag) => EditOperation::from_flag(*flag).ok_or_else(|| {
                CatalogError::InvalidArgument(format!("unknown operation flag {}", flag))
            }),
            Self::Name(name) => name.parse(),
        }
    }
}

/// Action request (tagged union).
///
/// Parameters are optional at this layer so that a missing parameter is
/// answered with a specific message rather than a generic parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    Search {
        #[serde(default)]
        tags: Option<BTreeMap<String, CountParam>>,
    },
    Fuzzy {
        #[serde(default)]
        tags: Option<Vec<String>>,
    },
    Thumbnail {
        #[serde(default)]
        thumbnail: Option<String>,
    },
    TagEdit {
        #[serde(default)]
        urls: Vec<String>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        operation: Option<OperationParam>,
    },
    Delete {
        #[serde(default)]
        urls: Vec<String>,
    },
    Insert(NewRecord),
    UploadQuery {
        #[serde(default)]
        image: Option<String>,
    },
}

impl ActionRequest {
    /// Action name, as sent on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search { .. } => "search",
            Self::Fuzzy { .. } => "fuzzy",
            Self::Thumbnail { .. } => "thumbnail",
            Self::TagEdit { .. } => "tag_edit",
            Self::Delete { .. } => "delete",
            Self::Insert(_) => "insert",
            Self::UploadQuery { .. } => "upload_query",
        }
    }
}

/// Canonical search constraints. Missing or empty tags is an error.
pub fn search_constraints(
    tags: Option<&BTreeMap<String, CountParam>>,
) -> Result<BTreeMap<String, u64>, CatalogError> {
    let tags = match tags {
        Some(tags) if !tags.is_empty() => tags,
        _ => return Err(CatalogError::InvalidArgument("Missing tags".to_string())),
    };
    tags.iter()
        .map(|(name, count)| Ok((name.clone(), count.to_count()?)))
        .collect()
}

/// Decode a standard base64 image.
pub fn decode_image(image: Option<&str>) -> Result<Vec<u8>, CatalogError> {
    let image = match image {
        Some(image) if !image.is_empty() => image,
        _ => {
            return Err(CatalogError::InvalidArgument(
                "Missing base64-encoded image".to_string(),
            ));
        }
    };
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, image)
        .map_err(|_| CatalogError::InvalidArgument("Base64 decode failed".to_string()))
}

// =============================================================================
// ACTION RESPONSES
// =============================================================================

/// `search`, `fuzzy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinksResponse {
    #[serde(rename = "Links")]
    pub links: Vec<String>,
}

/// `tag_edit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEditResponse {
    pub message: String,
    pub updated: Vec<String>,
}

impl TagEditResponse {
    pub fn success(updated: Vec<String>) -> Self {
        Self {
            message: "Tags updated".to_string(),
            updated,
        }
    }
}

/// `delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub blob_failures: Vec<BlobFailure>,
}

/// `insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResponse {
    pub message: String,
    pub filename: String,
}

impl InsertResponse {
    pub fn success(filename: String) -> Self {
        Self {
            message: "Item inserted".to_string(),
            filename,
        }
    }
}

/// `upload_query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageQueryResponse {
    pub inferred_tags: Vec<String>,
    #[serde(rename = "Links")]
    pub links: Vec<String>,
}

impl From<ImageQueryResult> for ImageQueryResponse {
    fn from(result: ImageQueryResult) -> Self {
        Self {
            inferred_tags: result.inferred_tags,
            links: result.links,
        }
    }
}

/// Error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
