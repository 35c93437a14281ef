//! Bounded Build -> Verify -> Review -> Simplify loop.
//!
//! Each iteration plans (or picks up the simplification carried from the
//! previous one), builds every action through the gate sequence, verifies
//! with a bounded number of fix rounds, and reviews with a strictness that
//! rises per iteration. An iteration with no critical findings ends the
//! loop. Otherwise the loop simplifies and goes round again, until the
//! convergence detector reports no progress or the iteration cap is hit.
//!
//! Every model call is admitted through the session usage meter first. A
//! refused call interrupts the iteration; the caller decides how to unwind.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::errors::GovernanceResult;
use crate::domain::models::{
    AbandonReason, Action, Alternative, CheckpointId, Confirmation, Cost, Decision,
    ExecutionPhase, HistoryEntry, HistoryRecord, Issue, Iteration, LimitBreach, SessionOutcome,
    Severity,
};
use crate::domain::ports::{
    ChangeAgent, ConfirmationHandler, ConfirmationRequest, HistorySink, Reviewer, ToolExecutor,
    Verifier,
};

use super::convergence_detector::ConvergenceDetector;
use super::gate_sequence::GateSequence;
use super::session_state::SessionState;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// External collaborators the loop drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Plans and simplifies changes.
    pub agent: Arc<dyn ChangeAgent>,
    /// Runs approved actions.
    pub executor: Arc<dyn ToolExecutor>,
    /// Checks the workspace after a build.
    pub verifier: Arc<dyn Verifier>,
    /// Reviews verified work.
    pub reviewer: Arc<dyn Reviewer>,
    /// Receives one record per gate decision.
    pub history: Arc<dyn HistorySink>,
    /// Asked before running actions that need confirmation.
    pub confirmer: Arc<dyn ConfirmationHandler>,
}

// ---------------------------------------------------------------------------
// Loop state
// ---------------------------------------------------------------------------

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStage {
    /// Asking the agent for a plan.
    Planning,
    /// Gating and executing planned actions.
    Building,
    /// Running the verifier.
    Verifying,
    /// Running the reviewer.
    Reviewing,
    /// Asking the agent to address findings.
    Simplifying,
    /// Finished with no critical findings.
    Done,
    /// Gave up and restored the workspace.
    Abandoned,
}

/// What a single iteration ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum IterationStep {
    /// Simplification planned; run the next iteration.
    Continue,
    /// No critical findings remain.
    Done(Iteration),
    /// No progress or out of iterations. The workspace has been restored to
    /// the failed iteration's first checkpoint, if it had one.
    Abandoned {
        /// Why the loop stopped.
        reason: AbandonReason,
        /// Checkpoint the workspace was restored to.
        restored_to: Option<CheckpointId>,
    },
    /// Every planned action was turned away by the gates.
    Rejected {
        /// Reason given by the last rejection.
        reason: String,
        /// Cheaper variants collected across the rejections.
        alternatives: Vec<Alternative>,
    },
    /// A session limit refused an external call. Nothing was restored.
    Interrupted(LimitBreach),
}

/// An approved action waiting for confirmation and execution.
struct Admitted {
    action: Action,
    cost: Cost,
    checkpoint: Option<CheckpointId>,
    confirmation: Confirmation,
}

enum Submission {
    Admitted(Admitted),
    Rejected(Decision),
}

#[derive(Default)]
struct Rejections {
    count: usize,
    last: Option<Decision>,
    alternatives: Vec<Alternative>,
}

// ---------------------------------------------------------------------------
// RefinementLoop
// ---------------------------------------------------------------------------

/// Drives plan, build, verify, review and simplify iterations through the gates.
pub struct RefinementLoop {
    collaborators: Collaborators,
    gates: GateSequence,
    iteration: u32,
    stage: LoopStage,
    /// Simplification actions built by the next iteration.
    carried: Option<Vec<Action>>,
    /// First checkpoint kept by the current iteration.
    first_checkpoint: Option<CheckpointId>,
    last_good: Option<Iteration>,
}

impl RefinementLoop {
    /// A loop in the `Planning` stage at iteration zero.
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            gates: GateSequence::new(),
            iteration: 0,
            stage: LoopStage::Planning,
            carried: None,
            first_checkpoint: None,
            last_good: None,
        }
    }

    /// Zero-based index of the current iteration.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Stage the loop is in.
    pub fn stage(&self) -> LoopStage {
        self.stage
    }

    /// The last iteration that completed before the current one.
    pub fn last_good(&self) -> Option<&Iteration> {
        self.last_good.as_ref()
    }

    /// Drive iterations until the loop terminates on its own.
    ///
    /// An interrupted iteration is treated as abandoned: the workspace is
    /// restored to that iteration's first checkpoint.
    pub async fn run(&mut self, state: &mut SessionState) -> GovernanceResult<SessionOutcome> {
        let outcome = loop {
            match self.run_iteration(state).await? {
                IterationStep::Continue => continue,
                IterationStep::Done(result) => {
                    break SessionOutcome::Completed {
                        result,
                        iterations: self.iteration + 1,
                    }
                }
                IterationStep::Abandoned {
                    reason,
                    restored_to,
                } => {
                    break SessionOutcome::Abandoned {
                        reason,
                        best_effort: self.last_good.clone(),
                        restored_to,
                    }
                }
                IterationStep::Rejected {
                    reason,
                    alternatives,
                } => {
                    break SessionOutcome::Rejected {
                        reason,
                        alternatives,
                        best_effort: self.last_good.clone(),
                    }
                }
                IterationStep::Interrupted(breach) => {
                    let restored_to = self.abandon(state).await?;
                    break SessionOutcome::Abandoned {
                        reason: AbandonReason::Interrupted(breach),
                        best_effort: self.last_good.clone(),
                        restored_to,
                    };
                }
            }
        };

        info!(outcome = outcome.label(), reason = %outcome.reason(), "Refinement loop finished");
        self.emit(state, HistoryEntry::Outcome {
            outcome: outcome.clone(),
        })
        .await;
        Ok(outcome)
    }

    /// Run one iteration from planning to its terminal step.
    #[instrument(skip(self, state), fields(session_id = %state.id, iteration = self.iteration))]
    pub async fn run_iteration(
        &mut self,
        state: &mut SessionState,
    ) -> GovernanceResult<IterationStep> {
        let settings = state.policy().refinement.clone();
        let mut record = Iteration::new(self.iteration);
        self.first_checkpoint = None;

        // Planning
        self.enter(LoopStage::Planning, state, ExecutionPhase::Gather);
        let actions = match self.carried.take() {
            Some(actions) => actions,
            None => {
                if let Err(breach) = state.usage.admit_call() {
                    return Ok(interrupted(breach));
                }
                let response = self.collaborators.agent.plan(self.iteration).await?;
                state.usage.record_tokens(response.usage.tokens);
                response.actions
            }
        };
        debug!(planned = actions.len(), "Plan ready");

        // Building
        self.enter(LoopStage::Building, state, ExecutionPhase::Act);
        let rejections = self.build(&actions, state, &mut record).await?;
        if !actions.is_empty() && rejections.count == actions.len() {
            let reason = match &rejections.last {
                Some(decision) => format!(
                    "all {} planned action(s) were rejected; last: {decision}",
                    actions.len()
                ),
                None => "all planned actions were rejected".to_string(),
            };
            warn!(%reason, "Iteration rejected");
            self.emit(state, HistoryEntry::Iteration {
                iteration: record,
            })
            .await;
            return Ok(IterationStep::Rejected {
                reason,
                alternatives: rejections.alternatives,
            });
        }

        // Verifying, with bounded fix rounds
        self.enter(LoopStage::Verifying, state, ExecutionPhase::Verify);
        let mut unresolved = Vec::new();
        loop {
            let verification = self.collaborators.verifier.verify().await?;
            if verification.is_passed() {
                break;
            }
            if record.fix_attempts >= settings.max_fix_attempts {
                unresolved = verification
                    .failures
                    .into_iter()
                    .map(|issue| Issue {
                        severity: Severity::Critical,
                        ..issue
                    })
                    .collect();
                break;
            }
            record.fix_attempts += 1;
            if let Err(breach) = state.usage.admit_call() {
                return Ok(interrupted(breach));
            }
            debug!(attempt = record.fix_attempts, failures = verification.failures.len(), "Requesting fix");
            let response = self
                .collaborators
                .agent
                .fix(self.iteration, &verification.failures)
                .await?;
            state.usage.record_tokens(response.usage.tokens);

            self.enter(LoopStage::Building, state, ExecutionPhase::Act);
            self.build(&response.actions, state, &mut record).await?;
            self.enter(LoopStage::Verifying, state, ExecutionPhase::Verify);
        }
        record.issues.extend(unresolved);

        // Reviewing
        self.enter(LoopStage::Reviewing, state, ExecutionPhase::Verify);
        if let Err(breach) = state.usage.admit_call() {
            return Ok(interrupted(breach));
        }
        let review = self.collaborators.reviewer.review(self.iteration).await?;
        state.usage.record_tokens(review.usage.tokens);
        let floor = settings.strictness_for(self.iteration);
        record
            .issues
            .extend(review.issues.into_iter().filter(|i| i.severity >= floor));

        self.emit(state, HistoryEntry::Iteration {
            iteration: record.clone(),
        })
        .await;
        state.window.push(record.clone());

        if !record.has_critical() {
            self.stage = LoopStage::Done;
            info!(
                issues = record.issues.len(),
                loc_delta = record.loc_delta,
                "Iteration converged"
            );
            self.last_good = Some(record.clone());
            return Ok(IterationStep::Done(record));
        }

        let detector = ConvergenceDetector::new(state.policy().convergence);
        let abandon = if let Some(stuck) = detector.diagnose(state.window.as_slice()) {
            Some(AbandonReason::Stuck(stuck))
        } else if self.iteration + 1 >= settings.max_iterations {
            Some(AbandonReason::MaxIterations {
                max: settings.max_iterations,
            })
        } else {
            None
        };
        if let Some(reason) = abandon {
            warn!(%reason, "Abandoning refinement");
            let restored_to = self.abandon(state).await?;
            return Ok(IterationStep::Abandoned {
                reason,
                restored_to,
            });
        }

        // Simplifying
        self.enter(LoopStage::Simplifying, state, ExecutionPhase::Gather);
        if let Err(breach) = state.usage.admit_call() {
            return Ok(interrupted(breach));
        }
        let critical: Vec<Issue> = record
            .issues
            .iter()
            .filter(|i| i.is_critical())
            .cloned()
            .collect();
        let response = self
            .collaborators
            .agent
            .simplify(self.iteration, &critical)
            .await?;
        state.usage.record_tokens(response.usage.tokens);

        debug!(
            critical = critical.len(),
            carried = response.actions.len(),
            "Simplification planned"
        );
        self.carried = Some(response.actions);
        self.last_good = Some(record);
        self.iteration += 1;
        Ok(IterationStep::Continue)
    }

    /// Restore the current iteration's first checkpoint, if any.
    pub async fn abandon(
        &mut self,
        state: &mut SessionState,
    ) -> GovernanceResult<Option<CheckpointId>> {
        self.stage = LoopStage::Abandoned;
        match self.first_checkpoint {
            Some(id) => {
                state.restore_checkpoint(id).await?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    async fn build(
        &mut self,
        actions: &[Action],
        state: &mut SessionState,
        record: &mut Iteration,
    ) -> GovernanceResult<Rejections> {
        let mut rejections = Rejections::default();

        for action in actions {
            let admitted = match self.submit(action, state).await? {
                Submission::Admitted(admitted) => admitted,
                Submission::Rejected(decision) => {
                    record.rejected_actions += 1;
                    rejections.count += 1;
                    if !decision.alternatives().is_empty() {
                        rejections.alternatives = decision.alternatives().to_vec();
                    }
                    rejections.last = Some(decision);
                    continue;
                }
            };

            if admitted.confirmation.is_required() {
                let request = ConfirmationRequest {
                    action: admitted.action.clone(),
                    cost: admitted.cost,
                    level: admitted.confirmation,
                };
                if !self.collaborators.confirmer.confirm(&request).await {
                    info!(tool = %admitted.action.tool, "Approval declined, rolling back");
                    self.roll_back(state, &admitted).await?;
                    record.rejected_actions += 1;
                    continue;
                }
            }

            match self.collaborators.executor.execute(&admitted.action).await {
                Ok(()) => {
                    record.approved_actions += 1;
                    record.loc_delta += admitted.action.estimated_loc_delta;
                    record.estimated_cost += admitted.cost.total;
                    if self.first_checkpoint.is_none() {
                        self.first_checkpoint = admitted.checkpoint;
                    }
                }
                Err(err) => {
                    warn!(tool = %admitted.action.tool, error = %err, "Tool execution failed, rolling back");
                    self.roll_back(state, &admitted).await?;
                    record.issues.push(Issue::critical(
                        format!("tool_failure:{}", admitted.action.tool),
                        err.to_string(),
                    ));
                }
            }
        }

        Ok(rejections)
    }

    /// Gate an action, resubmitting alternatives when the policy allows.
    async fn submit(
        &self,
        action: &Action,
        state: &mut SessionState,
    ) -> GovernanceResult<Submission> {
        let decision = self.gates.evaluate(action, state).await?;
        self.emit_decision(state, action, &decision).await;

        match decision {
            Decision::Approved {
                cost,
                checkpoint,
                confirmation,
            } => Ok(Submission::Admitted(Admitted {
                action: action.clone(),
                cost,
                checkpoint,
                confirmation,
            })),
            Decision::RejectedWithAlternatives { .. }
                if state.policy().refinement.auto_resubmit_alternatives =>
            {
                for revised in decision
                    .alternatives()
                    .iter()
                    .filter_map(|alt| alt.revised_action.as_ref())
                {
                    let retry = self.gates.evaluate(revised, state).await?;
                    self.emit_decision(state, revised, &retry).await;
                    if let Decision::Approved {
                        cost,
                        checkpoint,
                        confirmation,
                    } = retry
                    {
                        info!(original = %action.id, revised = %revised.id, "Alternative approved");
                        return Ok(Submission::Admitted(Admitted {
                            action: revised.clone(),
                            cost,
                            checkpoint,
                            confirmation,
                        }));
                    }
                }
                Ok(Submission::Rejected(decision))
            }
            other => Ok(Submission::Rejected(other)),
        }
    }

    /// Undo an admitted action: restore its checkpoint, or refund a
    /// read-only action's cost.
    async fn roll_back(&self, state: &mut SessionState, admitted: &Admitted) -> GovernanceResult<()> {
        match admitted.checkpoint {
            Some(id) => {
                state.restore_checkpoint(id).await?;
                state.checkpoints.discard(id);
            }
            None => state.budget.refund(admitted.cost.total)?,
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn enter(&mut self, stage: LoopStage, state: &mut SessionState, phase: ExecutionPhase) {
        self.stage = stage;
        state.phase = phase;
    }

    async fn emit_decision(&self, state: &SessionState, action: &Action, decision: &Decision) {
        self.emit(state, HistoryEntry::Decision {
            iteration: self.iteration,
            action: action.clone(),
            decision: decision.clone(),
        })
        .await;
    }

    async fn emit(&self, state: &SessionState, entry: HistoryEntry) {
        let record = HistoryRecord::new(state.id, entry);
        if let Err(err) = self.collaborators.history.record(&record).await {
            warn!(kind = record.kind(), error = %err, "History write failed");
        }
    }
}

fn interrupted(breach: LimitBreach) -> IterationStep {
    warn!(limit = breach.limit.as_str(), %breach, "External call refused");
    IterationStep::Interrupted(breach)
}
