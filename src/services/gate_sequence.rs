//! Ordered admission checks for proposed actions.
//!
//! Every action passes, in order: phase/capability, cost, budget,
//! permission and safety. The first failing gate decides. Nothing is
//! written until every gate has passed; the commit step then checkpoints
//! mutating actions and debits the budget, both or neither.

use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{BudgetError, GovernanceResult};
use crate::domain::models::{
    Action, CheckpointReason, Confirmation, Cost, Decision, GateKind, Policy, RejectionReason,
    WORKSPACE_ESCAPE_PATTERN,
};

use super::alternative_generator::AlternativeGenerator;
use super::cost_pricer::CostPricer;
use super::session_state::SessionState;

/// Result of the side-effect-free part of the gate sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum GateCheck {
    /// All gates passed; the commit step may run.
    Pass {
        /// Priced cost of the action.
        cost: Cost,
        /// Whether the action still needs a human confirmation.
        confirmation: Confirmation,
    },
    /// A gate decided against the action.
    Stop(Decision),
}

/// The five-gate admission pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateSequence {
    alternatives: AlternativeGenerator,
}

impl GateSequence {
    /// A gate sequence with the default alternative generator.
    pub fn new() -> Self {
        Self {
            alternatives: AlternativeGenerator::new(),
        }
    }

    /// Run every gate without touching the session. A non-finite cost is an
    /// invariant violation, not a rejection.
    pub fn check(&self, action: &Action, state: &SessionState) -> GovernanceResult<GateCheck> {
        let policy = state.policy();

        // 1. Phase / capability
        if !policy.phase_permits(state.phase, &action.tool, action.kind) {
            return Ok(GateCheck::Stop(Decision::Rejected {
                gate: GateKind::Phase,
                reason: RejectionReason::PhaseViolation {
                    phase: state.phase,
                    tool: action.tool.clone(),
                },
            }));
        }

        // 2. Cost
        let cost = CostPricer::from_policy(policy).price(action, &state.budget);
        if !cost.total.is_finite() {
            return Err(BudgetError::NonFinite(cost.total).into());
        }

        // 3. Budget
        let thresholds = &policy.thresholds;
        let over_budget = if cost.total > thresholds.reject {
            Some(RejectionReason::OverRejectThreshold {
                total: cost.total,
                reject_threshold: thresholds.reject,
            })
        } else if cost.total > state.budget.remaining {
            Some(RejectionReason::OverRemainingBudget {
                total: cost.total,
                remaining: state.budget.remaining,
            })
        } else {
            None
        };
        if let Some(reason) = over_budget {
            let alternatives = self.alternatives.suggest(action, policy, &state.budget);
            return Ok(GateCheck::Stop(Decision::RejectedWithAlternatives {
                cost,
                reason,
                alternatives,
            }));
        }
        let confirmation = if cost.total < thresholds.auto_proceed {
            Confirmation::NotRequired
        } else if cost.total <= thresholds.prompt {
            Confirmation::Confirm
        } else {
            Confirmation::Justify
        };

        // 4. Permission
        if let Some(reason) = permission_failure(action, state, policy) {
            return Ok(GateCheck::Stop(Decision::Rejected {
                gate: GateKind::Permission,
                reason,
            }));
        }

        // 5. Safety. A target outside the root could never be restored.
        let mut matched: Vec<String> = Vec::new();
        if let Some(path) = action.escaping_target() {
            debug!(path = %path.display(), "Target escapes the workspace");
            matched.push(WORKSPACE_ESCAPE_PATTERN.to_string());
        }
        matched.extend(
            policy
                .forbidden_patterns
                .iter()
                .filter(|p| p.matches(action))
                .map(|p| p.name.clone()),
        );
        if !matched.is_empty() {
            return Ok(GateCheck::Stop(Decision::Rejected {
                gate: GateKind::Safety,
                reason: RejectionReason::ForbiddenPatterns { patterns: matched },
            }));
        }

        Ok(GateCheck::Pass { cost, confirmation })
    }

    /// Run every gate and, if all pass, commit: checkpoint a mutating action
    /// and debit its cost.
    ///
    /// The checkpoint's budget snapshot is the pre-debit budget. A failed
    /// checkpoint downgrades the decision to `Rejected` with nothing
    /// debited; a failed debit discards the checkpoint and is an error.
    #[instrument(skip(self, action, state), fields(action_id = %action.id, tool = %action.tool, phase = %state.phase))]
    pub async fn evaluate(
        &self,
        action: &Action,
        state: &mut SessionState,
    ) -> GovernanceResult<Decision> {
        let (cost, confirmation) = match self.check(action, state)? {
            GateCheck::Pass { cost, confirmation } => (cost, confirmation),
            GateCheck::Stop(decision) => {
                warn!(
                    gate = decision.gate().map_or("none", |g| g.as_str()),
                    decision = %decision,
                    "Action rejected"
                );
                return Ok(decision);
            }
        };

        let checkpoint = if action.is_mutating() {
            let reason = CheckpointReason::BeforeAction {
                action: action.id,
                tool: action.tool.clone(),
            };
            match state.checkpoint(reason).await {
                Ok(cp) => Some(cp.id),
                Err(err) => {
                    warn!(error = %err, "Checkpoint failed, rejecting action");
                    return Ok(Decision::Rejected {
                        gate: GateKind::Commit,
                        reason: RejectionReason::CheckpointUnavailable {
                            reason: err.to_string(),
                        },
                    });
                }
            }
        } else {
            None
        };

        if let Err(err) = state.budget.debit(cost.total) {
            if let Some(id) = checkpoint {
                state.checkpoints.discard(id);
            }
            return Err(err.into());
        }

        debug!(remaining = state.budget.remaining, "Budget debited");
        info!(
            cost = cost.total,
            confirmation = confirmation.as_str(),
            checkpoint = ?checkpoint,
            "Action approved"
        );
        Ok(Decision::Approved {
            cost,
            checkpoint,
            confirmation,
        })
    }
}

fn permission_failure(
    action: &Action,
    state: &SessionState,
    policy: &Policy,
) -> Option<RejectionReason> {
    let Some(tier) = policy.tier_of(&action.tool) else {
        return Some(RejectionReason::UnknownTool {
            tool: action.tool.clone(),
        });
    };
    if !state.granted_tiers.contains(&tier) {
        return Some(RejectionReason::TierNotGranted {
            tool: action.tool.clone(),
            tier,
        });
    }
    if tier.is_privileged() && !policy.allow_privileged {
        return Some(RejectionReason::PrivilegedNotAllowed {
            tool: action.tool.clone(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::InMemoryWorkspace;
    use crate::domain::errors::GovernanceError;
    use crate::domain::models::{
        Budget, ExecutionPhase, FileState, ForbiddenPattern, PatternRule, PermissionTier,
    };

    fn session(policy: Policy, budget: f64) -> (Arc<InMemoryWorkspace>, SessionState) {
        let workspace = Arc::new(InMemoryWorkspace::new(
            FileState::new().with_file("src/lib.rs", "pub fn a() {}"),
        ));
        let state = SessionState::new(Arc::new(policy), Budget::new(budget), workspace.clone())
            .with_phase(ExecutionPhase::Act);
        (workspace, state)
    }

    #[tokio::test]
    async fn test_small_action_auto_approved_and_debited() {
        let (_, mut state) = session(Policy::default(), 1000.0);
        let action = Action::mutating("file_write").with_loc_delta(15);

        let decision = GateSequence::new().evaluate(&action, &mut state).await.unwrap();
        match decision {
            Decision::Approved {
                cost,
                checkpoint,
                confirmation,
            } => {
                assert_eq!(confirmation, Confirmation::NotRequired);
                assert!((cost.total - 15.0).abs() < f64::EPSILON);
                let cp = state.checkpoints.get(checkpoint.unwrap()).unwrap();
                assert!((cp.budget_snapshot.remaining - 1000.0).abs() < f64::EPSILON);
            }
            other => panic!("Expected Approved, got {:?}", other),
        }
        assert!((state.budget.remaining - 985.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_confirmation_levels() {
        let (_, mut state) = session(Policy::default(), 10_000.0);
        let gates = GateSequence::new();

        let mid = Action::mutating("file_write").with_loc_delta(300);
        let high = Action::mutating("file_write").with_loc_delta(801);
        let edge = Action::mutating("file_write").with_loc_delta(800);

        let level = |d: Decision| match d {
            Decision::Approved { confirmation, .. } => confirmation,
            other => panic!("Expected Approved, got {:?}", other),
        };
        assert_eq!(level(gates.evaluate(&mid, &mut state).await.unwrap()), Confirmation::Confirm);
        assert_eq!(level(gates.evaluate(&edge, &mut state).await.unwrap()), Confirmation::Confirm);
        assert_eq!(level(gates.evaluate(&high, &mut state).await.unwrap()), Confirmation::Justify);
    }

    #[tokio::test]
    async fn test_over_reject_threshold_offers_alternatives() {
        let policy = Policy::default().with_thresholds(300.0, 600.0, 800.0);
        let (_, mut state) = session(policy, 10_000.0);
        let action = Action::mutating("file_write").with_loc_delta(1840);

        let decision = GateSequence::new().evaluate(&action, &mut state).await.unwrap();
        match &decision {
            Decision::RejectedWithAlternatives {
                alternatives,
                reason,
                ..
            } => {
                assert_eq!(alternatives.len(), 3);
                assert!(alternatives.iter().all(|a| a.cost_reduction > 0.0));
                assert!(matches!(reason, RejectionReason::OverRejectThreshold { .. }));
            }
            other => panic!("Expected RejectedWithAlternatives, got {:?}", other),
        }
        assert!(state.checkpoints.is_empty());
        assert!((state.budget.remaining - 10_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_over_remaining_budget_rejected() {
        let (_, mut state) = session(Policy::default(), 10.0);
        let action = Action::mutating("file_write").with_loc_delta(11);

        let decision = GateSequence::new().evaluate(&action, &mut state).await.unwrap();
        assert!(matches!(
            decision,
            Decision::RejectedWithAlternatives {
                reason: RejectionReason::OverRemainingBudget { .. },
                ..
            }
        ));
        assert!((state.budget.remaining - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_mutation_outside_act_phase() {
        let (_, state) = session(Policy::default(), 100.0);
        let mut state = state.with_phase(ExecutionPhase::Gather);
        let decision = GateSequence::new()
            .evaluate(&Action::mutating("file_write").with_loc_delta(1), &mut state)
            .await
            .unwrap();
        assert_eq!(decision.gate(), Some(GateKind::Phase));

        let read = GateSequence::new()
            .evaluate(&Action::read_only("file_read"), &mut state)
            .await
            .unwrap();
        assert!(read.is_approved());
        assert!(read.checkpoint().is_none());
    }

    #[tokio::test]
    async fn test_phase_gate_runs_before_budget_gate() {
        let (_, state) = session(Policy::default(), 1.0);
        let mut state = state.with_phase(ExecutionPhase::Verify);
        let decision = GateSequence::new()
            .evaluate(&Action::mutating("file_write").with_loc_delta(5000), &mut state)
            .await
            .unwrap();
        assert_eq!(decision.gate(), Some(GateKind::Phase));
    }

    #[tokio::test]
    async fn test_permission_gate() {
        let (_, mut state) = session(Policy::default(), 1000.0);
        let gates = GateSequence::new();

        let unknown = gates
            .evaluate(&Action::mutating("teleport"), &mut state)
            .await
            .unwrap();
        assert!(matches!(
            unknown,
            Decision::Rejected {
                reason: RejectionReason::UnknownTool { .. },
                ..
            }
        ));

        state.granted_tiers.insert(PermissionTier::PRIVILEGED);
        let privileged = gates
            .evaluate(&Action::mutating("git_push"), &mut state)
            .await
            .unwrap();
        assert!(matches!(
            privileged,
            Decision::Rejected {
                reason: RejectionReason::PrivilegedNotAllowed { .. },
                ..
            }
        ));

        state.granted_tiers.remove(&PermissionTier::EXECUTE);
        let shell = gates
            .evaluate(&Action::mutating("shell"), &mut state)
            .await
            .unwrap();
        assert!(matches!(
            shell,
            Decision::Rejected {
                reason: RejectionReason::TierNotGranted { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_privileged_allowed_when_enabled() {
        let mut policy = Policy::default();
        policy.allow_privileged = true;
        policy.granted_tiers.insert(PermissionTier::PRIVILEGED);
        let (_, mut state) = session(policy, 1000.0);

        let decision = GateSequence::new()
            .evaluate(&Action::mutating("file_delete").with_loc_delta(-10), &mut state)
            .await
            .unwrap();
        assert!(decision.is_approved());
        assert!((state.budget.remaining - 1010.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_safety_gate_reports_all_matches() {
        let mut policy = Policy::default();
        policy.forbidden_patterns.push(ForbiddenPattern::new(
            "no-new-deps",
            PatternRule::NewDependenciesAbove { limit: 0 },
        ));
        let (_, mut state) = session(policy, 1000.0);
        let action = Action::mutating("file_write")
            .with_targets([".env"])
            .with_dependencies(["dotenv"]);

        match GateSequence::new().evaluate(&action, &mut state).await.unwrap() {
            Decision::Rejected {
                gate: GateKind::Safety,
                reason: RejectionReason::ForbiddenPatterns { patterns },
            } => {
                assert_eq!(patterns, vec!["secret-files".to_string(), "no-new-deps".to_string()]);
            }
            other => panic!("Expected safety rejection, got {:?}", other),
        }
        assert!(state.checkpoints.is_empty());
    }

    #[tokio::test]
    async fn test_targets_outside_workspace_rejected() {
        let gates = GateSequence::new();
        for target in ["../outside.txt", "/etc/passwd", "src/../../outside.txt"] {
            let (_, mut state) = session(Policy::default(), 1000.0);
            let action = Action::mutating("file_write")
                .with_loc_delta(5)
                .with_targets([target]);

            match gates.evaluate(&action, &mut state).await.unwrap() {
                Decision::Rejected {
                    gate: GateKind::Safety,
                    reason: RejectionReason::ForbiddenPatterns { patterns },
                } => {
                    assert_eq!(patterns, vec![WORKSPACE_ESCAPE_PATTERN.to_string()], "{target}");
                }
                other => panic!("Expected safety rejection for {target}, got {:?}", other),
            }
            assert!(state.checkpoints.is_empty());
            assert!((state.budget.remaining - 1000.0).abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn test_escape_check_survives_custom_patterns() {
        let mut policy = Policy::default();
        policy.forbidden_patterns.clear();
        let (_, mut state) = session(policy, 1000.0);
        let action = Action::read_only("file_read").with_targets(["../../.ssh/id_rsa"]);

        let decision = GateSequence::new().evaluate(&action, &mut state).await.unwrap();
        assert_eq!(decision.gate(), Some(GateKind::Safety));
    }

    #[tokio::test]
    async fn test_checkpoint_failure_downgrades_to_rejected() {
        let (workspace, mut state) = session(Policy::default(), 1000.0);
        workspace.set_available(false);

        let decision = GateSequence::new()
            .evaluate(&Action::mutating("file_write").with_loc_delta(20), &mut state)
            .await
            .unwrap();
        assert_eq!(decision.gate(), Some(GateKind::Commit));
        assert!((state.budget.remaining - 1000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_non_finite_cost_is_invariant_violation() {
        let (_, mut state) = session(Policy::default(), 1000.0);
        let action = Action::mutating("file_write").with_risk(f64::NAN, 0.0);

        match GateSequence::new().evaluate(&action, &mut state).await {
            Err(GovernanceError::InvariantViolation(_)) => {}
            other => panic!("Expected InvariantViolation, got {:?}", other),
        }
        assert!(state.checkpoints.is_empty());
    }

    #[test]
    fn test_check_has_no_side_effects() {
        let (_, state) = session(Policy::default(), 1000.0);
        let check = GateSequence::new()
            .check(&Action::mutating("file_write").with_loc_delta(50), &state)
            .unwrap();
        assert!(matches!(check, GateCheck::Pass { .. }));
        assert!((state.budget.remaining - 1000.0).abs() < f64::EPSILON);
        assert!(state.checkpoints.is_empty());
    }
}
