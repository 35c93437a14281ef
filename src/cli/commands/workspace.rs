//! Workspace CLI command: what a checkpoint would capture.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::FsWorkspace;
use crate::cli::display::{list_table, output, render_list, CommandOutput};
use crate::domain::ports::WorkspaceStore;
use crate::infrastructure::config::WardenConfig;

/// A file a checkpoint would capture.
#[derive(Debug, Serialize)]
pub struct TrackedFile {
    /// Path relative to the root.
    pub path: PathBuf,
    /// Size in bytes.
    pub bytes: usize,
    /// Hex SHA-256 of the contents.
    pub sha256: String,
}

/// Result of `warden workspace`.
#[derive(Debug, Serialize)]
pub struct WorkspaceOutput {
    /// Workspace root.
    pub root: PathBuf,
    /// Tracked files in path order.
    pub files: Vec<TrackedFile>,
}

impl CommandOutput for WorkspaceOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["path", "bytes", "sha256"]);
        for file in &self.files {
            table.add_row(vec![
                file.path.display().to_string(),
                file.bytes.to_string(),
                file.sha256.get(..12).unwrap_or(&file.sha256).to_string(),
            ]);
        }
        render_list("tracked file", &table, self.files.len())
    }
}

/// List the tracked files under `root`.
pub async fn execute(config: &WardenConfig, root: &Path, json_mode: bool) -> Result<()> {
    let result = tracked_files(config, root).await?;
    output(&result, json_mode);
    Ok(())
}

/// Capture `root` with the configured globs and summarise each file.
pub async fn tracked_files(config: &WardenConfig, root: &Path) -> Result<WorkspaceOutput> {
    let workspace = FsWorkspace::with_patterns(
        root,
        &config.workspace.include,
        &config.workspace.exclude,
    )?;
    let state = workspace
        .capture()
        .await
        .with_context(|| format!("Failed to capture workspace at {}", root.display()))?;

    let hashes = state.hashes();
    let files = state
        .files
        .iter()
        .map(|(path, bytes)| TrackedFile {
            path: path.clone(),
            bytes: bytes.len(),
            sha256: hashes.get(path).cloned().unwrap_or_default(),
        })
        .collect();

    Ok(WorkspaceOutput {
        root: root.to_path_buf(),
        files,
    })
}
