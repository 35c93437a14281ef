//! Command-line interface: argument types, command handlers and output.

pub mod commands;
pub mod display;
pub mod types;

use std::path::Path;

use anyhow::Result;

pub use types::{Cli, Commands, PolicyCommands};

use crate::infrastructure::config::{ConfigLoader, WardenConfig};

/// Load configuration from `--config` if given, else from `.warden/`.
pub fn load_config(path: Option<&Path>) -> Result<WardenConfig> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print a command error and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain.get(1..).unwrap_or_default(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );
    } else {
        eprintln!("{}", display::action_failure(&format!("{err:#}")));
    }
    std::process::exit(1);
}
