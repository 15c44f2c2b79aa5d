//! # Application Configuration
//!
//! Settings read from an optional TOML file. CLI flags override file values;
//! anything neither sets falls back to the defaults below.
//!
//! ```toml
//! database = "birdtag.redb"
//! backend = "redb"
//! blob_root = "blobs"
//! add_policy = "overwrite"
//! host = "127.0.0.1"
//! port = 8080
//! ```

use birdtag_core::{
    AddPolicy, CatalogEngine, CatalogError, EngineConfig, LocalBlobStore, StorageBackend,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Catalog store selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Redb,
    Memory,
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: PathBuf,
    pub backend: BackendKind,
    pub blob_root: PathBuf,
    pub add_policy: AddPolicy,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("birdtag.redb"),
            backend: BackendKind::Redb,
            blob_root: PathBuf::from("blobs"),
            add_policy: AddPolicy::Overwrite,
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Values given on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub blob_root: Option<PathBuf>,
    pub add_policy: Option<AddPolicy>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl AppConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Io(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content).map_err(|e| {
            CatalogError::InvalidArgument(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Parse TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `path` if given, otherwise start from defaults, then apply
    /// overrides.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, CatalogError> {
        let base = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(base.with_overrides(overrides))
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(database) = overrides.database {
            self.database = database;
        }
        if let Some(backend) = overrides.backend {
            self.backend = backend;
        }
        if let Some(blob_root) = overrides.blob_root {
            self.blob_root = blob_root;
        }
        if let Some(add_policy) = overrides.add_policy {
            self.add_policy = add_policy;
        }
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        self
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default().with_add_policy(self.add_policy)
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open the configured catalog and blob stores.
    pub fn open_engine(&self) -> Result<CatalogEngine, CatalogError> {
        let store = match self.backend {
            BackendKind::Redb => StorageBackend::with_redb(&self.database)?,
            BackendKind::Memory => StorageBackend::default(),
        };
        let blobs = LocalBlobStore::new(&self.blob_root)?;
        tracing::debug!(
            backend = store.name(),
            blob_root = %blobs.root().display(),
            add_policy = %self.add_policy,
            "catalog opened"
        );
        Ok(CatalogEngine::new(
            store,
            Arc::new(blobs),
            self.engine_config(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::from_toml("port = 9000\nadd_policy = \"increment\"\n")
            .expect("parse");
        assert_eq!(config.port, 9000);
        assert_eq!(config.add_policy, AddPolicy::Increment);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.backend, BackendKind::Redb);
    }

    #[test]
    fn overrides_win() {
        let config = AppConfig::default().with_overrides(ConfigOverrides {
            backend: Some(BackendKind::Memory),
            port: Some(1234),
            ..Default::default()
        });
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.port, 1234);
        assert_eq!(config.bind_addr(), "127.0.0.1:1234");
    }

    #[test]
    fn unknown_policy_rejected() {
        assert!(AppConfig::from_toml("add_policy = \"sometimes\"").is_err());
    }

    #[test]
    fn load_from_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("birdtag.toml");
        std::fs::write(&path, "backend = \"memory\"\nhost = \"0.0.0.0\"\n").expect("write");

        let config = AppConfig::resolve(Some(&path), ConfigOverrides::default()).expect("load");
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn open_memory_engine() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = AppConfig {
            backend: BackendKind::Memory,
            blob_root: temp.path().join("blobs"),
            ..Default::default()
        };
        let engine = config.open_engine().expect("open");
        assert_eq!(engine.store().name(), "memory");
        assert!(temp.path().join("blobs").is_dir());
    }
}
