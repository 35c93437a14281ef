//! Warden - governance gates for autonomous code changes
//!
//! Warden sits between a change-proposing agent and the tools that would
//! carry out its changes. Every proposed action is priced, checked against
//! a policy through an ordered gate sequence, and checkpointed before it
//! runs, so a session can always be rolled back. A bounded refinement loop
//! drives plan, build, verify, review and simplify stages under session-wide
//! circuit breakers.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, error taxonomy and port traits
//! - **Service Layer** (`services`): pricing, gating, checkpoints, the loop
//! - **Adapters** (`adapters`): workspace, history, confirmation and clock ports
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden::{Action, Budget, ExecutionPhase, GateSequence, InMemoryWorkspace, Policy, SessionState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut state = SessionState::new(
//!         Arc::new(Policy::default()),
//!         Budget::new(1000.0),
//!         Arc::new(InMemoryWorkspace::default()),
//!     )
//!     .with_phase(ExecutionPhase::Act);
//!     let decision = GateSequence::new()
//!         .evaluate(&Action::mutating("file_write").with_loc_delta(40), &mut state)
//!         .await?;
//!     assert!(decision.is_approved());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{
    AutoConfirm, FsWorkspace, InMemoryHistory, InMemoryWorkspace, JsonlHistory, ManualClock,
    MonotonicClock,
};
pub use domain::errors::{
    BudgetError, DomainError, DomainResult, GovernanceError, GovernanceResult, RollbackError,
};
pub use domain::models::{
    Action, ActionKind, Alternative, Budget, Checkpoint, Cost, Decision, ExecutionPhase, Issue,
    Iteration, Policy, SessionOutcome, Severity, SpecificationBudget,
};
pub use domain::ports::{
    ChangeAgent, ConfirmationHandler, HistorySink, Reviewer, SessionClock, ToolExecutor,
    Verifier, WorkspaceStore,
};
pub use infrastructure::config::{ConfigError, ConfigLoader, WardenConfig};
pub use services::{
    CheckpointManager, Collaborators, CostPricer, GateSequence, RefinementLoop, SessionGovernor,
    SessionState,
};
