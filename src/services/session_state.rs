//! Mutable state of one governed session.
//!
//! There is no ambient state: the gate sequence, the refinement loop and the
//! governor all receive a `&mut SessionState` explicitly.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::adapters::MonotonicClock;
use crate::domain::errors::{DomainResult, RollbackError};
use crate::domain::models::{
    Budget, Checkpoint, CheckpointId, CheckpointReason, ExecutionPhase, IterationWindow,
    PermissionTier, Policy, UsageMeter,
};
use crate::domain::ports::{SessionClock, WorkspaceStore};

use super::checkpoint_manager::CheckpointManager;

/// Budget, phase, grants, checkpoints and usage of one session.
pub struct SessionState {
    /// Session identifier, also stamped on history records.
    pub id: Uuid,
    policy: Arc<Policy>,
    /// Remaining cost budget.
    pub budget: Budget,
    /// Current execution phase.
    pub phase: ExecutionPhase,
    /// Permission tiers granted for this session.
    pub granted_tiers: BTreeSet<PermissionTier>,
    /// Checkpoints taken so far.
    pub checkpoints: CheckpointManager,
    /// Recent iterations used for convergence detection.
    pub window: IterationWindow,
    /// External calls and tokens consumed.
    pub usage: UsageMeter,
    clock: Arc<dyn SessionClock>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("id", &self.id)
            .field("budget", &self.budget)
            .field("phase", &self.phase)
            .field("checkpoints", &self.checkpoints)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

impl SessionState {
    /// A session in the `Gather` phase with the policy's granted tiers and a
    /// wall clock started now.
    pub fn new(policy: Arc<Policy>, budget: Budget, workspace: Arc<dyn WorkspaceStore>) -> Self {
        Self {
            id: Uuid::new_v4(),
            budget,
            phase: ExecutionPhase::Gather,
            granted_tiers: policy.granted_tiers.clone(),
            checkpoints: CheckpointManager::new(workspace),
            window: IterationWindow::new(policy.convergence.window),
            usage: UsageMeter::new(&policy.session_limits),
            clock: Arc::new(MonotonicClock::start()),
            policy,
        }
    }

    /// Replace the wall clock, mainly for tests.
    pub fn with_clock(mut self, clock: Arc<dyn SessionClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Start in `phase` instead of `Gather`.
    pub fn with_phase(mut self, phase: ExecutionPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Policy the session runs under.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Time since the session started.
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Snapshot the workspace together with the current budget.
    pub async fn checkpoint(&mut self, reason: CheckpointReason) -> DomainResult<Checkpoint> {
        let budget = self.budget;
        self.checkpoints.create(reason, budget).await
    }

    /// Restore files and budget to `id`. On error neither has changed.
    pub async fn restore_checkpoint(&mut self, id: CheckpointId) -> Result<(), RollbackError> {
        self.budget = self.checkpoints.restore(id).await?;
        Ok(())
    }
}
