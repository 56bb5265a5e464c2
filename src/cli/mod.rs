//! Command-line interface for taskkeep
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;

mod list;
mod sync;

/// taskkeep - keep the history of recurring tasks
///
/// Reconciles a task-list service against the last local snapshot and
/// recreates completions that were lost when a recurring task reset.
#[derive(Parser, Debug)]
#[command(name = "taskkeep")]
#[command(author, version, long_about = None)]
#[command(about = "taskkeep - keep the history of recurring tasks")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (defaults to ./taskkeep.toml)
    #[arg(long, global = true, env = "TASKKEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the remote, reconcile, archive lost completions and save
    Sync,

    /// Show the last saved snapshot
    ///
    /// Completed copies that taskkeep wrote back to the remote are hidden
    /// when the local archival record they duplicate is shown; pass --all
    /// to include them.
    List {
        /// Only tasks in the list with this name or id
        #[arg(long)]
        list: Option<String>,

        /// Only archival records
        #[arg(long)]
        archived: bool,

        /// Include remote archival copies of local archival records
        #[arg(long)]
        all: bool,
    },
}

impl Cli {
    /// Execute the parsed command
    pub fn run(self) -> Result<()> {
        let config_path = Config::resolve_path(self.config.as_deref());
        let config = Config::load_or_default(&config_path)?;
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        match self.command {
            Commands::Sync => runtime.block_on(sync::run(sync::SyncOptions { config, output })),
            Commands::List {
                list,
                archived,
                all,
            } => runtime.block_on(list::run(list::ListOptions {
                config,
                list,
                archived,
                all,
                output,
            })),
        }
    }
}
