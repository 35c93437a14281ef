//! Session-wide circuit breakers around the refinement loop.
//!
//! Before every iteration the governor takes a boundary checkpoint and
//! checks elapsed time, external calls, cost spent and tokens against the
//! policy limits. A tripped limit, at a boundary or mid-iteration, restores
//! the latest boundary checkpoint and ends the session with
//! `SessionTimeout` or `SessionExhausted`. These checks do not depend on
//! anything the loop decides.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::errors::GovernanceResult;
use crate::domain::models::{
    CheckpointId, CheckpointReason, HistoryEntry, HistoryRecord, LimitBreach, LimitKind,
    SessionOutcome,
};
use crate::domain::ports::HistorySink;

use super::refinement_loop::{Collaborators, IterationStep, RefinementLoop};
use super::session_state::SessionState;

/// Runs a refinement loop to a terminal [`SessionOutcome`] within the
/// session limits.
pub struct SessionGovernor {
    refinement: RefinementLoop,
    history: Arc<dyn HistorySink>,
}

impl SessionGovernor {
    /// A governor driving a fresh refinement loop.
    pub fn new(collaborators: Collaborators) -> Self {
        let history = collaborators.history.clone();
        Self {
            refinement: RefinementLoop::new(collaborators),
            history,
        }
    }

    /// The loop run for each implement-phase task.
    pub fn refinement(&self) -> &RefinementLoop {
        &self.refinement
    }

    /// First session limit currently exceeded, if any.
    pub fn check_limits(state: &SessionState) -> Option<LimitBreach> {
        let limits = &state.policy().session_limits;

        let elapsed = state.elapsed();
        if elapsed > limits.max_duration() {
            return Some(LimitBreach {
                limit: LimitKind::WallClock,
                used: elapsed.as_secs_f64(),
                max: limits.max_duration().as_secs_f64(),
            });
        }
        if let Some(breach) = state.usage.call_breach() {
            return Some(breach);
        }
        if state.budget.spent > limits.max_cost {
            return Some(LimitBreach {
                limit: LimitKind::Cost,
                used: state.budget.spent,
                max: limits.max_cost,
            });
        }
        state.usage.token_breach()
    }

    /// Drive the loop to completion or until a limit trips.
    #[instrument(skip(self, state), fields(session_id = %state.id))]
    pub async fn run(&mut self, state: &mut SessionState) -> GovernanceResult<SessionOutcome> {
        let outcome = loop {
            let boundary = state
                .checkpoint(CheckpointReason::IterationBoundary {
                    iteration: self.refinement.iteration(),
                })
                .await?
                .id;

            if let Some(breach) = Self::check_limits(state) {
                break self.halt(state, boundary, breach).await?;
            }

            match self.refinement.run_iteration(state).await? {
                IterationStep::Continue => continue,
                IterationStep::Done(result) => {
                    break SessionOutcome::Completed {
                        result,
                        iterations: self.refinement.iteration() + 1,
                    };
                }
                IterationStep::Abandoned {
                    reason,
                    restored_to,
                } => {
                    break SessionOutcome::Abandoned {
                        reason,
                        best_effort: self.refinement.last_good().cloned(),
                        restored_to,
                    };
                }
                IterationStep::Rejected {
                    reason,
                    alternatives,
                } => {
                    break SessionOutcome::Rejected {
                        reason,
                        alternatives,
                        best_effort: self.refinement.last_good().cloned(),
                    };
                }
                IterationStep::Interrupted(breach) => {
                    break self.halt(state, boundary, breach).await?;
                }
            }
        };

        info!(
            outcome = outcome.label(),
            reason = %outcome.reason(),
            spent = state.budget.spent,
            external_calls = state.usage.external_calls,
            "Session finished"
        );
        let record = HistoryRecord::new(state.id, HistoryEntry::Outcome {
            outcome: outcome.clone(),
        });
        if let Err(err) = self.history.record(&record).await {
            warn!(error = %err, "History write failed");
        }
        Ok(outcome)
    }

    async fn halt(
        &mut self,
        state: &mut SessionState,
        boundary: CheckpointId,
        breach: LimitBreach,
    ) -> GovernanceResult<SessionOutcome> {
        warn!(limit = breach.limit.as_str(), %breach, "Session limit reached, restoring boundary");
        state.restore_checkpoint(boundary).await?;

        let best_effort = self.refinement.last_good().cloned();
        Ok(match breach.limit {
            LimitKind::WallClock => SessionOutcome::SessionTimeout {
                breach,
                elapsed: state.elapsed(),
                best_effort,
                restored_to: boundary,
            },
            LimitKind::ExternalCalls | LimitKind::Cost | LimitKind::Tokens => {
                SessionOutcome::SessionExhausted {
                    breach,
                    best_effort,
                    restored_to: boundary,
                }
            }
        })
    }
}
