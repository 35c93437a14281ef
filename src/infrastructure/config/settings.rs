//! Top-level configuration document.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::models::Policy;
use crate::infrastructure::logging::LogConfig;

/// Everything loaded from `.warden/config.yaml` and friends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Session governance policy.
    #[serde(default)]
    pub policy: Policy,

    /// Console and file logging.
    #[serde(default)]
    pub logging: LogConfig,

    /// Which files a filesystem workspace tracks.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// JSON Lines history file; history is kept in memory when unset.
    #[serde(default)]
    pub history_path: Option<PathBuf>,
}

/// Globs selecting the files a checkpoint captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Files to track.
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    /// Files to skip even when included.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
        }
    }
}

fn default_include() -> Vec<String> {
    vec!["**/*".to_string()]
}

fn default_exclude() -> Vec<String> {
    crate::adapters::workspace::filesystem::DEFAULT_EXCLUDES
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}
