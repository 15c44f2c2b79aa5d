//! # birdtag-core
//!
//! The tag query and mutation engine for the birdtag media catalog.
//!
//! A catalog holds media records, each annotated with a sparse map of
//! species names to counts. This crate evaluates tag predicates over full
//! catalog snapshots and applies read-modify-write tag merges, and it
//! retires records together with their blobs.
//!
//! ## Collaborators
//!
//! Everything the engine touches outside its own logic sits behind a trait:
//! - `CatalogStore`: keyed record store (`MemoryStore`, `RedbStore`)
//! - `BlobStore`: object store for media and thumbnails
//! - `Classifier`: image to species names
//!
//! ## Constraints
//!
//! - No async, no network dependencies
//! - No caches or indexes: every query re-scans the store
//! - Tag counts are non-negative integers; absent means zero

// =============================================================================
// MODULES
// =============================================================================

pub mod backend;
pub mod blob;
pub mod cascade;
pub mod classify;
pub mod config;
pub mod engine;
pub mod ingestor;
pub mod mutation;
pub mod primitives;
pub mod query;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{AddPolicy, CatalogError, EditOperation, MediaRecord, TagMap, TagValue};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use backend::StorageBackend;
pub use blob::{BlobLocation, BlobStore, LocalBlobStore, MemoryBlobStore};
pub use cascade::{BlobFailure, DeleteReport};
pub use classify::{Classifier, FixedClassifier, ImageQueryResult};
pub use config::EngineConfig;
pub use engine::{CatalogEngine, CatalogStatus};
pub use ingestor::{Ingestor, NewRecord};
pub use mutation::{EditReport, ItemFailure, MutationEngine, TagDelta};
pub use query::Predicate;
pub use storage::RedbStore;
pub use store::{CatalogStore, MemoryStore};
