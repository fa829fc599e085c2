//! # Sphynx CLI Module
//!
//! This module implements the CLI interface for Sphynx.
//!
//! ## Available Commands
//!
//! - `init` - Create the data directories and catalog
//! - `status` - Show persisted entities and recorded instances
//! - `run` - Execute a JSON plan of operation instances
//! - `show` - Load and print one entity
//! - `export-unordered` - Write an entity to the unordered staging area
//! - `import-unordered` - Read an entity back from the staging area
//! - `purge` - Drop an entity from memory, disk and the catalog
//! - `classes` - List registered operation classes

mod commands;

use crate::config;
use clap::{Parser, Subcommand};
use sphynx_core::{Guid, SphynxError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Sphynx - content-addressed graph entity store
///
/// Entities are named by guids derived from the operation that produced
/// them, so rerunning a plan only computes what is missing.
#[derive(Parser, Debug)]
#[command(name = "sphynx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root of the position-ordered entity data
    #[arg(long, global = true, env = config::ORDERED_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Root of the unordered staging data
    #[arg(long, global = true, env = config::UNORDERED_DIR_ENV)]
    pub unordered_data_dir: Option<PathBuf>,

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
    /// Create the data directories and catalog
    Init {
        /// Wipe existing data first
        #[arg(short, long)]
        force: bool,
    },

    /// Show persisted entities and recorded instances
    Status,

    /// Execute a JSON plan
    Run {
        /// Path to the plan file
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Load and print one entity
    Show {
        /// Entity guid (64 hex characters)
        guid: Guid,

        /// Maximum number of rows to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Write an entity to the unordered staging area
    ExportUnordered {
        /// Entity guid (64 hex characters)
        guid: Guid,
    },

    /// Read an entity from the unordered staging area and persist it
    ImportUnordered {
        /// Entity guid (64 hex characters)
        guid: Guid,
    },

    /// Delete a persisted entity and its catalog entry
    Purge {
        /// Entity guid (64 hex characters)
        guid: Guid,
    },

    /// List registered operation classes
    Classes,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), SphynxError> {
    let json_mode = cli.json_mode;
    let overrides = config::Overrides {
        data_dir: cli.data_dir,
        unordered_data_dir: cli.unordered_data_dir,
    };
    let store_config = config::load(cli.config.as_deref(), &overrides)?;

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&store_config, force),
        Some(Commands::Status) => cmd_status(&store_config, json_mode),
        Some(Commands::Run { plan }) => cmd_run(&store_config, &plan, json_mode),
        Some(Commands::Show { guid, limit }) => cmd_show(&store_config, guid, limit, json_mode),
        Some(Commands::ExportUnordered { guid }) => cmd_export_unordered(&store_config, guid),
        Some(Commands::ImportUnordered { guid }) => cmd_import_unordered(&store_config, guid),
        Some(Commands::Purge { guid }) => cmd_purge(&store_config, guid),
        Some(Commands::Classes) => cmd_classes(json_mode),
        None => {
            // No subcommand - show status by default
            cmd_status(&store_config, json_mode)
        }
    }
}
