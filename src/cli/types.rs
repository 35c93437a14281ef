//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::models::ExecutionPhase;

/// Command-line entry point.
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Warden - governance gates for autonomous code changes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .warden/
    #[arg(short, long, global = true, env = "WARDEN_CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Policy inspection commands
    #[command(subcommand)]
    Policy(PolicyCommands),

    /// Run one or more actions through the gate sequence
    Evaluate {
        /// YAML file holding an action or a list of actions
        file: PathBuf,

        /// Execution phase to evaluate in
        #[arg(short, long, default_value = "act")]
        phase: ExecutionPhase,

        /// Remaining budget (defaults to the session cost limit)
        #[arg(short, long)]
        remaining: Option<f64>,
    },

    /// Price actions without gating them
    Price {
        /// YAML file holding an action or a list of actions
        file: PathBuf,

        /// Remaining budget used for utilization
        #[arg(short, long)]
        remaining: Option<f64>,
    },

    /// Budget implied by a specification envelope
    Envelope {
        /// Maximum LOC delta
        #[arg(long, default_value = "0")]
        max_loc: u32,

        /// Maximum number of new files
        #[arg(long, default_value = "0")]
        max_files: u32,

        /// Maximum number of new dependencies
        #[arg(long, default_value = "0")]
        max_deps: u32,
    },

    /// List the files a checkpoint would capture
    Workspace {
        /// Workspace root
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// Show a recorded session history
    History {
        /// JSON Lines file (defaults to the configured history_path)
        file: Option<PathBuf>,

        /// Only show records of this kind (decision, iteration, outcome)
        #[arg(short, long)]
        kind: Option<String>,
    },
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Show the effective policy
    Show,

    /// Validate configuration and report where it was loaded from
    Check,
}
