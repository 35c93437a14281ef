//! Domain models for the governance engine.

pub mod action;
pub mod budget;
pub mod checkpoint;
pub mod cost;
pub mod decision;
pub mod history;
pub mod iteration;
pub mod policy;
pub mod session;

pub use action::{Action, ActionKind};
pub use budget::{Budget, SpecificationBudget};
pub use checkpoint::{content_hash, Checkpoint, CheckpointId, CheckpointReason, FileState};
pub use cost::Cost;
pub use decision::{
    Alternative, AlternativeStrategy, Confirmation, Decision, GateKind, RejectionReason,
};
pub use history::{HistoryEntry, HistoryRecord};
pub use iteration::{Issue, Iteration, IterationWindow, Severity};
pub use policy::{
    AlternativeSettings, ConvergenceSettings, CostWeights, ExecutionPhase, ForbiddenPattern,
    GateThresholds, PatternRule, PermissionTier, Policy, RefinementSettings, SessionLimits,
    WORKSPACE_ESCAPE_PATTERN,
};
pub use session::{AbandonReason, LimitBreach, LimitKind, SessionOutcome, StuckReason, UsageMeter};
