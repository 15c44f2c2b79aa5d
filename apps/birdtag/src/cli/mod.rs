//! # birdtag CLI Module
//!
//! This module implements the CLI interface for birdtag.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new catalog database
//! - `status` - Show catalog status
//! - `insert` - Insert records from a JSON file
//! - `search` - Threshold search (`--tag crow=2`)
//! - `fuzzy` - Any-match search (`--tag crow`)
//! - `thumbnail` - Look up a record by thumbnail link
//! - `tag-edit` - Add or remove tags on records
//! - `delete` - Delete records and their blobs
//! - `list` - List every record
//! - `compact` - Compact the catalog database file

mod commands;

use crate::config::{AppConfig, BackendKind, ConfigOverrides};
use birdtag_core::{AddPolicy, CatalogError, EditOperation};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// birdtag - species-tagged media catalog
///
/// Search, edit, and retire catalog entries by their species tags.
#[derive(Parser, Debug)]
#[command(name = "birdtag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the catalog database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Catalog backend
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Root directory of the local blob store
    #[arg(long, global = true)]
    pub blob_root: Option<PathBuf>,

    /// How tag-edit adds combine with existing counts (overwrite, increment)
    #[arg(long, global = true)]
    pub add_policy: Option<AddPolicy>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty catalog
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Show catalog status
    Status,

    /// Insert records from a JSON file (one object or an array)
    Insert {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Find records meeting every minimum count
    Search {
        /// Constraint as name=min (repeatable)
        #[arg(short, long = "tag", value_parser = parse_threshold, required = true)]
        tags: Vec<(String, u64)>,
    },

    /// Find records carrying any of the tags
    Fuzzy {
        /// Tag name (repeatable)
        #[arg(short, long = "tag", required = true)]
        tags: Vec<String>,
    },

    /// Look up a record by its thumbnail link
    Thumbnail {
        /// Thumbnail link
        link: String,
    },

    /// Add or remove tags on records
    TagEdit {
        /// Thumbnail link of a target record (repeatable)
        #[arg(short, long = "link", required = true)]
        links: Vec<String>,

        /// Delta as "name,count" (repeatable)
        #[arg(short, long = "delta", required = true)]
        deltas: Vec<String>,

        /// Operation: add or remove
        #[arg(short, long = "op")]
        op: EditOperation,
    },

    /// Delete records and their blobs
    Delete {
        /// Thumbnail link of a target record (repeatable)
        #[arg(short, long = "link", required = true)]
        links: Vec<String>,
    },

    /// List every record
    List,

    /// Compact the catalog database file
    Compact,
}

/// Parse a `name=min` search constraint.
pub fn parse_threshold(raw: &str) -> Result<(String, u64), String> {
    let (name, min) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=min, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty tag name in '{}'", raw));
    }
    let min = min
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid minimum in '{}': {}", raw, e))?;
    Ok((name.to_string(), min))
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CatalogError> {
    let (host, port) = match &cli.command {
        Some(Commands::Server { host, port }) => (host.clone(), *port),
        _ => (None, None),
    };
    let config = AppConfig::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            database: cli.database,
            backend: cli.backend,
            blob_root: cli.blob_root,
            add_policy: cli.add_policy,
            host,
            port,
        },
    )?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&config).await,
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Insert { file }) => cmd_insert(&config, json_mode, &file),
        Some(Commands::Search { tags }) => cmd_search(&config, json_mode, tags),
        Some(Commands::Fuzzy { tags }) => cmd_fuzzy(&config, json_mode, tags),
        Some(Commands::Thumbnail { link }) => cmd_thumbnail(&config, json_mode, &link),
        Some(Commands::TagEdit { links, deltas, op }) => {
            cmd_tag_edit(&config, json_mode, &links, &deltas, op)
        }
        Some(Commands::Delete { links }) => cmd_delete(&config, json_mode, &links),
        Some(Commands::List) => cmd_list(&config, json_mode),
        Some(Commands::Compact) => cmd_compact(&config, json_mode),
        None => {
            // No subcommand - show status by default
            cmd_status(&config, json_mode)
        }
    }
}
