//! Checkpoints of tracked workspace state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::budget::Budget;

/// Identifier of a checkpoint within a session.
pub type CheckpointId = Uuid;

/// Why a checkpoint was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckpointReason {
    /// Immediately before an approved mutating action.
    BeforeAction {
        /// Id of the approved action.
        action: Uuid,
        /// Tool that will carry it out.
        tool: String,
    },
    /// Taken by the governor before an iteration starts.
    IterationBoundary {
        /// Index of the iteration about to start.
        iteration: u32,
    },
    /// Requested by a caller.
    Manual {
        /// Caller-supplied label.
        label: String,
    },
}

impl std::fmt::Display for CheckpointReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeforeAction { tool, .. } => write!(f, "before {tool}"),
            Self::IterationBoundary { iteration } => write!(f, "iteration {iteration} boundary"),
            Self::Manual { label } => f.write_str(label),
        }
    }
}

/// Metadata for one snapshot. The file contents live with the checkpoint
/// manager, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Identifier handed back in `Decision::Approved`.
    pub id: CheckpointId,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Why it was taken.
    pub reason: CheckpointReason,
    /// SHA-256 hex digest of every tracked file.
    pub file_hashes: BTreeMap<PathBuf, String>,
    /// Budget as it stood when the snapshot was taken.
    pub budget_snapshot: Budget,
}

/// Full contents of every tracked file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    /// Contents keyed by workspace-relative path.
    pub files: BTreeMap<PathBuf, Vec<u8>>,
}

impl FileState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// SHA-256 hex digest of every file.
    pub fn hashes(&self) -> BTreeMap<PathBuf, String> {
        self.files
            .iter()
            .map(|(path, bytes)| (path.clone(), content_hash(bytes)))
            .collect()
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files are tracked.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
