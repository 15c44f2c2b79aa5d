//! # Engine Configuration
//!
//! Settings the engine carries across operations. Loaded by the app from its
//! TOML file or CLI flags and handed to `CatalogEngine` at construction.

use crate::AddPolicy;
use serde::{Deserialize, Serialize};

/// Engine-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How `Add` tag edits combine with existing counts.
    pub add_policy: AddPolicy,
}

impl EngineConfig {
    #[must_use]
    pub fn with_add_policy(mut self, add_policy: AddPolicy) -> Self {
        self.add_policy = add_policy;
        self
    }
}
