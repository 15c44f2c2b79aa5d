//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState};
use crate::config::{AppConfig, BackendKind};
use birdtag_core::{CatalogEngine, CatalogError, EditOperation, NewRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for `insert` input (100 MB).
const MAX_INSERT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CatalogError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CatalogError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CatalogError::InvalidArgument(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CatalogError> {
    let canonical = path.canonicalize().map_err(|e| {
        CatalogError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CatalogError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Pretty-print a value as JSON.
fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

fn print_links(json_mode: bool, links: &[String]) {
    if json_mode {
        print_json(&serde_json::json!({ "Links": links }));
        return;
    }
    if links.is_empty() {
        println!("No matching records");
    }
    for link in links {
        println!("{}", link);
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), CatalogError> {
    let engine = open_engine(config)?;

    println!("birdtag server starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", config.host);
    println!("  Port:       {}", config.port);
    println!("  Backend:    {}", engine.store().name());
    println!("  Database:   {:?}", config.database);
    println!(
        "  Blobs:      {} ({:?})",
        engine.blob_store().backend_name(),
        config.blob_root
    );
    println!("  Add policy: {}", engine.config().add_policy);
    println!();
    println!("Endpoints:");
    println!("  POST /       - Action dispatch");
    println!("  POST /query  - Action dispatch");
    println!("  GET  /status - Catalog status");
    println!("  GET  /health - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config.bind_addr(), AppState::new(engine)).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new catalog database.
pub fn cmd_init(config: &AppConfig, force: bool) -> Result<(), CatalogError> {
    if config.backend == BackendKind::Memory {
        println!("Memory backend selected; nothing to initialize");
        return Ok(());
    }

    let db_path = &config.database;
    if db_path.exists() {
        if !force {
            return Err(CatalogError::InvalidArgument(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| CatalogError::Io(format!("Remove existing database: {}", e)))?;
    }

    let _engine = open_engine(config)?;
    println!("Initialized new redb catalog at {:?}", db_path);
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show catalog status.
pub fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), CatalogError> {
    let engine = open_engine(config)?;
    let status = engine.backend_status()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": status.backend,
            "blob_backend": status.blob_backend,
            "add_policy": status.add_policy,
            "records": status.records,
            "distinct_tags": status.distinct_tags
        }));
        return Ok(());
    }

    println!("birdtag Catalog Status");
    println!("======================");
    println!("Database:   {:?}", config.database);
    println!("Backend:    {}", status.backend);
    println!("Blobs:      {} ({:?})", status.blob_backend, config.blob_root);
    println!("Add policy: {}", status.add_policy);
    println!();
    println!("Records:       {}", status.records);
    println!("Distinct tags: {}", status.distinct_tags);

    Ok(())
}

// =============================================================================
// INSERT COMMAND
// =============================================================================

/// Insert records from a JSON file holding one object or an array of them.
///
/// Stops at the first invalid record; earlier records stay written.
pub fn cmd_insert(config: &AppConfig, json_mode: bool, file: &Path) -> Result<(), CatalogError> {
    tracing::info!("Inserting from {:?}", file);

    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_INSERT_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| CatalogError::Io(format!("Read file: {}", e)))?;
    let value: serde_json::Value = serde_json::from_slice(&contents)
        .map_err(|e| CatalogError::InvalidArgument(format!("Invalid JSON: {}", e)))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let mut engine = open_engine(config)?;
    let mut inserted = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let new: NewRecord = serde_json::from_value(item).map_err(|e| {
            CatalogError::InvalidArgument(format!("Record {}: {}", index, e))
        })?;
        let id = engine
            .insert(new)
            .map_err(|e| CatalogError::InvalidArgument(format!("Record {}: {}", index, e)))?;
        inserted.push(id);
    }

    if json_mode {
        print_json(&serde_json::json!({ "inserted": inserted }));
    } else {
        println!("Inserted {} records", inserted.len());
    }
    Ok(())
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

/// Threshold search.
pub fn cmd_search(
    config: &AppConfig,
    json_mode: bool,
    tags: Vec<(String, u64)>,
) -> Result<(), CatalogError> {
    let engine = open_engine(config)?;
    let constraints: BTreeMap<String, u64> = tags.into_iter().collect();
    let links = engine.search(constraints)?;
    print_links(json_mode, &links);
    Ok(())
}

/// Any-match search.
pub fn cmd_fuzzy(config: &AppConfig, json_mode: bool, tags: Vec<String>) -> Result<(), CatalogError> {
    let engine = open_engine(config)?;
    let links = engine.fuzzy(tags)?;
    print_links(json_mode, &links);
    Ok(())
}

/// Look up a record by thumbnail link.
pub fn cmd_thumbnail(config: &AppConfig, json_mode: bool, link: &str) -> Result<(), CatalogError> {
    let engine = open_engine(config)?;
    let record = engine.thumbnail(link)?;

    if json_mode {
        match record {
            Some(record) => print_json(&record),
            None => print_json(&serde_json::json!({})),
        }
        return Ok(());
    }

    match record {
        Some(record) => {
            println!("Record {}", record.id);
            println!("  Media:     {}", record.media_url);
            println!("  Thumbnail: {}", record.thumbnail_url);
            println!("  Type:      {}", record.file_type);
            println!("  Uploader:  {}", record.uploader);
            println!("  Timestamp: {}", record.timestamp);
            println!("  Tags:");
            for (name, count) in record.tags.iter() {
                println!("    {} = {}", name, count);
            }
        }
        None => println!("No record with thumbnail {}", link),
    }
    Ok(())
}

/// List every record.
pub fn cmd_list(config: &AppConfig, json_mode: bool) -> Result<(), CatalogError> {
    let engine = open_engine(config)?;
    let records = engine.list()?;

    if json_mode {
        print_json(&records);
        return Ok(());
    }

    println!("{} records", records.len());
    for record in &records {
        let tags: Vec<String> = record
            .tags
            .iter()
            .map(|(name, count)| format!("{}={}", name, count))
            .collect();
        println!("  {}  [{}]", record.id, tags.join(", "));
    }
    Ok(())
}

// =============================================================================
// MUTATION COMMANDS
// =============================================================================

/// Add or remove tags on the records behind `links`.
pub fn cmd_tag_edit(
    config: &AppConfig,
    json_mode: bool,
    links: &[String],
    deltas: &[String],
    op: EditOperation,
) -> Result<(), CatalogError> {
    let mut engine = open_engine(config)?;
    let report = engine.edit_tags(links, deltas, op)?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Updated {} records", report.updated.len());
    for link in &report.skipped {
        println!("  skipped (no record): {}", link);
    }
    for failure in &report.failed {
        println!("  failed: {} ({})", failure.link, failure.error);
    }
    Ok(())
}

/// Delete the records behind `links` along with their blobs.
pub fn cmd_delete(config: &AppConfig, json_mode: bool, links: &[String]) -> Result<(), CatalogError> {
    let mut engine = open_engine(config)?;
    let report = engine.delete(links)?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Deleted {} records", report.deleted.len());
    for id in &report.deleted {
        println!("  {}", id);
    }
    for failure in &report.blob_failures {
        println!("  blob left behind: {} ({})", failure.url, failure.error);
    }
    for failure in &report.failed {
        println!("  failed: {} ({})", failure.link, failure.error);
    }
    Ok(())
}

// =============================================================================
// MAINTENANCE COMMANDS
// =============================================================================

/// Compact the catalog database file.
pub fn cmd_compact(config: &AppConfig, json_mode: bool) -> Result<(), CatalogError> {
    let mut engine = open_engine(config)?;
    let compacted = engine.store_mut().compact()?;

    if json_mode {
        print_json(&serde_json::json!({
            "backend": engine.store().name(),
            "compacted": compacted
        }));
    } else if compacted {
        println!("Compacted {:?}", config.database);
    } else {
        println!("{} backend has nothing to compact", engine.store().name());
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the engine described by `config`.
pub fn open_engine(config: &AppConfig) -> Result<CatalogEngine, CatalogError> {
    let engine = config.open_engine()?;
    if !engine.store().is_persistent() {
        tracing::warn!("memory backend: changes are discarded when the command exits");
    }
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn temp_config(dir: &Path) -> AppConfig {
        AppConfig {
            database: dir.join("catalog.redb"),
            blob_root: dir.join("blobs"),
            ..Default::default()
        }
    }

    #[test]
    fn insert_then_edit_through_commands() {
        let temp = tempdir().expect("temp dir");
        let config = temp_config(temp.path());
        cmd_init(&config, false).expect("init");

        let input = temp.path().join("records.json");
        std::fs::write(
            &input,
            r#"[{"filename":"f1","s3_url":"m1","thumbnail_url":"u1","tags":{"crow":2},
                "timestamp":"t","uploader":"u","file_type":"image"}]"#,
        )
        .expect("write");
        cmd_insert(&config, true, &input).expect("insert");

        cmd_tag_edit(
            &config,
            true,
            &["u1".to_string()],
            &["owl,1".to_string()],
            EditOperation::Add,
        )
        .expect("edit");

        let engine = open_engine(&config).expect("open");
        let record = engine.thumbnail("u1").expect("lookup").expect("present");
        assert_eq!(record.tags.count("owl"), 1);
        assert_eq!(record.tags.count("crow"), 2);
    }

    #[test]
    fn init_refuses_existing_database() {
        let temp = tempdir().expect("temp dir");
        let config = temp_config(temp.path());
        cmd_init(&config, false).expect("init");

        assert!(matches!(
            cmd_init(&config, false),
            Err(CatalogError::InvalidArgument(_))
        ));
        cmd_init(&config, true).expect("force init");
    }

    #[test]
    fn insert_rejects_incomplete_record() {
        let temp = tempdir().expect("temp dir");
        let config = temp_config(temp.path());
        let input = temp.path().join("bad.json");
        std::fs::write(&input, r#"{"filename":"f1"}"#).expect("write");

        assert!(matches!(
            cmd_insert(&config, true, &input),
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn compact_keeps_records() {
        let temp = tempdir().expect("temp dir");
        let config = temp_config(temp.path());
        cmd_init(&config, false).expect("init");

        let input = temp.path().join("records.json");
        std::fs::write(
            &input,
            r#"{"filename":"f1","s3_url":"m1","thumbnail_url":"u1","tags":{"crow":2},
                "timestamp":"t","uploader":"u","file_type":"image"}"#,
        )
        .expect("write");
        cmd_insert(&config, true, &input).expect("insert");
        cmd_delete(&config, true, &["u1".to_string()]).expect("delete");
        cmd_insert(&config, true, &input).expect("insert again");

        cmd_compact(&config, true).expect("compact");

        let engine = open_engine(&config).expect("open");
        assert!(engine.store().is_persistent());
        assert_eq!(engine.list().expect("list").len(), 1);
    }

    #[test]
    fn compact_memory_backend_is_noop() {
        let temp = tempdir().expect("temp dir");
        let config = AppConfig {
            backend: BackendKind::Memory,
            ..temp_config(temp.path())
        };
        cmd_compact(&config, true).expect("compact");
        assert!(!config.database.exists());
    }
}
