//! Error types for the governance engine.
//!
//! Expected rejections (budget exceeded, permission denied, forbidden
//! pattern, phase violation) are never errors: they are `Decision` values.
//! The types here cover collaborator failures, rollback failures and
//! invariant violations only.

use thiserror::Error;
use uuid::Uuid;

/// Failures reported by external collaborators (model provider, tool
/// executor, verifier, workspace storage, history writer).
#[derive(Debug, Error)]
pub enum DomainError {
    /// The workspace store could not be read or written.
    #[error("Workspace storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An approved action failed while being carried out.
    #[error("Tool execution failed for '{tool}': {reason}")]
    ToolExecutionFailed {
        /// Tool that failed.
        tool: String,
        /// Failure reported by the executor.
        reason: String,
    },

    /// The planner or reviewer call failed.
    #[error("Model provider call failed: {0}")]
    ModelProviderFailed(String),

    /// The project's checks could not be run at all.
    #[error("Verification could not run: {0}")]
    VerificationFailed(String),

    /// A history record could not be written.
    #[error("History writer failed: {0}")]
    HistoryWriteFailed(String),

    /// Input rejected before any work was done.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Encoding or decoding a record failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type for port calls.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

/// A rollback could not be completed. Always fatal for the session: the
/// workspace is left exactly as it was before the attempt.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// The id was never issued, or was discarded or pruned.
    #[error("Checkpoint {0} is not known to this session")]
    UnknownCheckpoint(Uuid),

    /// The checkpoint exists but its file snapshot does not.
    #[error("Snapshot for checkpoint {0} is missing")]
    SnapshotMissing(Uuid),

    /// A stored file no longer matches its recorded hash.
    #[error("Snapshot for checkpoint {checkpoint} failed integrity check on {path}")]
    IntegrityMismatch {
        /// Checkpoint being restored.
        checkpoint: Uuid,
        /// Workspace-relative path of the mismatching file.
        path: String,
    },

    /// The workspace store failed during the restore.
    #[error("Storage unavailable while restoring checkpoint {checkpoint}: {reason}")]
    Storage {
        /// Checkpoint being restored.
        checkpoint: Uuid,
        /// Failure reported by the store.
        reason: String,
    },
}

/// Budget arithmetic failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BudgetError {
    /// The debit is larger than what remains.
    #[error("Debit of {requested:.2} would overdraw remaining budget {remaining:.2}")]
    Overdraft {
        /// Amount asked for.
        requested: f64,
        /// Amount left before the debit.
        remaining: f64,
    },

    /// NaN or infinite amount.
    #[error("Budget amount must be finite, got {0}")]
    NonFinite(f64),
}

/// Fatal engine errors. Anything in here terminates the session and must be
/// surfaced to the operator.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Restoring a checkpoint failed.
    #[error("Rollback failed: {0}")]
    Rollback(#[from] RollbackError),

    /// Internal accounting went wrong.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// An external collaborator failed.
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] DomainError),
}

impl From<BudgetError> for GovernanceError {
    fn from(err: BudgetError) -> Self {
        GovernanceError::InvariantViolation(err.to_string())
    }
}

/// Result type for engine operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_error_maps_to_invariant_violation() {
        let err: GovernanceError = BudgetError::Overdraft {
            requested: 10.0,
            remaining: 2.0,
        }
        .into();
        assert!(matches!(err, GovernanceError::InvariantViolation(_)));
        assert!(err.to_string().contains("overdraw"));
    }

    #[test]
    fn test_rollback_error_display_names_checkpoint() {
        let id = Uuid::new_v4();
        let err = RollbackError::UnknownCheckpoint(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
