//! Atomic snapshots of tracked files and budget counters.
//!
//! The manager owns the full file contents of every checkpoint it creates,
//! keyed by checkpoint id. Before a snapshot is written back it is verified
//! against the hashes recorded when it was taken, so a corrupted snapshot
//! fails the restore instead of half-applying.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainResult, RollbackError};
use crate::domain::models::{Budget, Checkpoint, CheckpointId, CheckpointReason, FileState};
use crate::domain::ports::WorkspaceStore;

/// Creates, verifies and restores checkpoints for one session.
pub struct CheckpointManager {
    workspace: Arc<dyn WorkspaceStore>,
    /// In creation order.
    checkpoints: Vec<Checkpoint>,
    snapshots: HashMap<CheckpointId, FileState>,
}

impl std::fmt::Debug for CheckpointManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointManager")
            .field("checkpoints", &self.checkpoints.len())
            .finish_non_exhaustive()
    }
}

impl CheckpointManager {
    /// An empty manager capturing from `workspace`.
    pub fn new(workspace: Arc<dyn WorkspaceStore>) -> Self {
        Self {
            workspace,
            checkpoints: Vec::new(),
            snapshots: HashMap::new(),
        }
    }

    /// Capture the tracked files and pair them with `budget`.
    #[instrument(skip(self, reason, budget), fields(reason = %reason))]
    pub async fn create(
        &mut self,
        reason: CheckpointReason,
        budget: Budget,
    ) -> DomainResult<Checkpoint> {
        let files = self.workspace.capture().await?;
        let checkpoint = Checkpoint {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            reason,
            file_hashes: files.hashes(),
            budget_snapshot: budget,
        };

        debug!(
            checkpoint_id = %checkpoint.id,
            files = files.len(),
            remaining = checkpoint.budget_snapshot.remaining,
            "Checkpoint created"
        );

        self.snapshots.insert(checkpoint.id, files);
        self.checkpoints.push(checkpoint.clone());
        Ok(checkpoint)
    }

    /// Check that the stored snapshot still matches the recorded hashes.
    pub fn verify(&self, id: CheckpointId) -> Result<(), RollbackError> {
        let checkpoint = self.get(id).ok_or(RollbackError::UnknownCheckpoint(id))?;
        let snapshot = self
            .snapshots
            .get(&id)
            .ok_or(RollbackError::SnapshotMissing(id))?;

        let actual = snapshot.hashes();
        if actual.len() != checkpoint.file_hashes.len() {
            let path = checkpoint
                .file_hashes
                .keys()
                .find(|p| !actual.contains_key(*p))
                .or_else(|| actual.keys().find(|p| !checkpoint.file_hashes.contains_key(*p)))
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(RollbackError::IntegrityMismatch {
                checkpoint: id,
                path,
            });
        }
        for (path, expected) in &checkpoint.file_hashes {
            if actual.get(path) != Some(expected) {
                return Err(RollbackError::IntegrityMismatch {
                    checkpoint: id,
                    path: path.display().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Write the snapshot back and return the budget it was taken with.
    ///
    /// All-or-nothing: on error neither the files nor the caller's budget
    /// have been touched. Callers apply the returned budget.
    #[instrument(skip(self))]
    pub async fn restore(&mut self, id: CheckpointId) -> Result<Budget, RollbackError> {
        self.verify(id)?;
        let checkpoint = self.get(id).ok_or(RollbackError::UnknownCheckpoint(id))?;
        let budget = checkpoint.budget_snapshot;
        let snapshot = self
            .snapshots
            .get(&id)
            .ok_or(RollbackError::SnapshotMissing(id))?;

        if let Err(err) = self.workspace.restore(snapshot).await {
            error!(checkpoint_id = %id, error = %err, "Checkpoint restore failed");
            return Err(RollbackError::Storage {
                checkpoint: id,
                reason: err.to_string(),
            });
        }

        info!(checkpoint_id = %id, remaining = budget.remaining, "Checkpoint restored");
        Ok(budget)
    }

    /// Checkpoints in creation order.
    pub fn list(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Checkpoint with the given id.
    pub fn get(&self, id: CheckpointId) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.id == id)
    }

    /// Most recent checkpoint.
    pub fn latest(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    /// Number of checkpoints kept.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// True when no checkpoint has been taken.
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Drop a checkpoint whose approval was rolled back.
    pub fn discard(&mut self, id: CheckpointId) -> bool {
        let before = self.checkpoints.len();
        self.checkpoints.retain(|c| c.id != id);
        self.snapshots.remove(&id);
        before != self.checkpoints.len()
    }

    /// Keep only the newest `keep_last` checkpoints. Returns how many were
    /// removed.
    pub fn prune(&mut self, keep_last: usize) -> usize {
        if self.checkpoints.len() <= keep_last {
            return 0;
        }
        let excess = self.checkpoints.len() - keep_last;
        for removed in self.checkpoints.drain(..excess) {
            self.snapshots.remove(&removed.id);
        }
        warn!(removed = excess, kept = keep_last, "Pruned old checkpoints");
        excess
    }
}
