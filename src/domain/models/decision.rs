//! Gate decisions and suggested alternatives.
//!
//! A [`Decision`] is the only thing the gate sequence hands back for a
//! well-formed action. Rejections are ordinary values: callers branch on
//! them, log them and show them to operators.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::checkpoint::CheckpointId;
use super::cost::Cost;
use super::policy::{ExecutionPhase, PermissionTier};

/// Extra ceremony an approval needs before the action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// Cost below the auto-proceed threshold.
    NotRequired,
    /// Cost between the auto-proceed and prompt thresholds.
    Confirm,
    /// Cost between the prompt and reject thresholds.
    Justify,
}

impl Confirmation {
    /// Whether a confirmation handler must be asked.
    pub fn is_required(self) -> bool {
        self != Self::NotRequired
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRequired => "none",
            Self::Confirm => "confirm",
            Self::Justify => "justify",
        }
    }
}

/// The admission check that produced a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Phase/capability table.
    Phase,
    /// Pricing.
    Cost,
    /// Reject threshold and remaining budget.
    Budget,
    /// Tool permission tiers.
    Permission,
    /// Forbidden patterns and the workspace sandbox.
    Safety,
    /// The commit step after all gates passed.
    Commit,
}

impl GateKind {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phase => "phase",
            Self::Cost => "cost",
            Self::Budget => "budget",
            Self::Permission => "permission",
            Self::Safety => "safety",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an action was turned away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The tool is not allowed in the current phase.
    PhaseViolation {
        /// Phase the session is in.
        phase: ExecutionPhase,
        /// Tool that was refused.
        tool: String,
    },
    /// Cost above the reject threshold.
    OverRejectThreshold {
        /// Priced cost.
        total: f64,
        /// Threshold it exceeded.
        reject_threshold: f64,
    },
    /// Cost above what remains of the budget.
    OverRemainingBudget {
        /// Priced cost.
        total: f64,
        /// Budget left.
        remaining: f64,
    },
    /// The tool has no registered tier.
    UnknownTool {
        /// Tool that was refused.
        tool: String,
    },
    /// The tool's tier was not granted for this session.
    TierNotGranted {
        /// Tool that was refused.
        tool: String,
        /// Tier the tool needs.
        tier: PermissionTier,
    },
    /// A tier 3 tool while privileged tools are disabled.
    PrivilegedNotAllowed {
        /// Tool that was refused.
        tool: String,
    },
    /// One or more safety patterns matched.
    ForbiddenPatterns {
        /// Names of every matching pattern.
        patterns: Vec<String>,
    },
    /// The commit step could not take a checkpoint.
    CheckpointUnavailable {
        /// Failure reported by the workspace store.
        reason: String,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PhaseViolation { phase, tool } => {
                write!(f, "tool '{tool}' is not permitted during the {phase} phase")
            }
            Self::OverRejectThreshold {
                total,
                reject_threshold,
            } => write!(
                f,
                "cost {total:.2} exceeds the rejection threshold {reject_threshold:.2}"
            ),
            Self::OverRemainingBudget { total, remaining } => write!(
                f,
                "cost {total:.2} exceeds the remaining budget {remaining:.2}"
            ),
            Self::UnknownTool { tool } => write!(f, "tool '{tool}' has no registered permission tier"),
            Self::TierNotGranted { tool, tier } => {
                write!(f, "tool '{tool}' needs {tier}, which this session was not granted")
            }
            Self::PrivilegedNotAllowed { tool } => {
                write!(f, "tool '{tool}' is privileged and privileged tools are disabled")
            }
            Self::ForbiddenPatterns { patterns } => {
                write!(f, "matches forbidden patterns: {}", patterns.join(", "))
            }
            Self::CheckpointUnavailable { reason } => {
                write!(f, "could not checkpoint before mutation: {reason}")
            }
        }
    }
}

/// Outcome of running an action through the gate sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Every gate passed; the cost has been debited.
    Approved {
        /// Debited cost.
        cost: Cost,
        /// Present for every approved mutating action.
        checkpoint: Option<CheckpointId>,
        /// Ceremony needed before the action runs.
        confirmation: Confirmation,
    },
    /// Over budget; cheaper variants are offered.
    RejectedWithAlternatives {
        /// Priced cost of the original action.
        cost: Cost,
        /// Which budget limit was exceeded.
        reason: RejectionReason,
        /// At most `max_alternatives` cheaper variants.
        alternatives: Vec<Alternative>,
    },
    /// Turned away by a non-budget gate.
    Rejected {
        /// Gate that decided.
        gate: GateKind,
        /// Why.
        reason: RejectionReason,
    },
}

impl Decision {
    /// Whether the action may run.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    /// Priced cost, when pricing ran.
    pub fn cost(&self) -> Option<&Cost> {
        match self {
            Self::Approved { cost, .. } | Self::RejectedWithAlternatives { cost, .. } => Some(cost),
            Self::Rejected { .. } => None,
        }
    }

    /// Checkpoint taken for an approved mutating action.
    pub fn checkpoint(&self) -> Option<CheckpointId> {
        match self {
            Self::Approved { checkpoint, .. } => *checkpoint,
            _ => None,
        }
    }

    /// Suggested alternatives; empty unless over budget.
    pub fn alternatives(&self) -> &[Alternative] {
        match self {
            Self::RejectedWithAlternatives { alternatives, .. } => alternatives,
            _ => &[],
        }
    }

    /// Gate that decided; `None` for approvals.
    pub fn gate(&self) -> Option<GateKind> {
        match self {
            Self::Approved { .. } => None,
            Self::RejectedWithAlternatives { .. } => Some(GateKind::Budget),
            Self::Rejected { gate, .. } => Some(*gate),
        }
    }

    /// Stable snake_case name of the variant.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "approved",
            Self::RejectedWithAlternatives { .. } => "rejected_with_alternatives",
            Self::Rejected { .. } => "rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved {
                cost, confirmation, ..
            } => write!(f, "approved at cost {cost} (confirmation: {})", confirmation.as_str()),
            Self::RejectedWithAlternatives {
                reason,
                alternatives,
                ..
            } => write!(f, "rejected: {reason}; {} alternative(s) offered", alternatives.len()),
            Self::Rejected { gate, reason } => write!(f, "rejected by {gate} gate: {reason}"),
        }
    }
}

/// Cost-reduction strategies, in the order the generator tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeStrategy {
    /// Fold a multi-file change into one file.
    ConsolidateIntoOneFile,
    /// Extend existing code instead of adding new code.
    ReuseExistingCapability,
    /// Drop the new abstractions.
    RemoveNewAbstraction,
    /// Strip boilerplate from a large change.
    RemoveBoilerplate,
    /// Replace new types with plain functions.
    PreferFunctionsOverClasses,
    /// Keep the action and ask for more budget.
    RequestBudgetIncrease,
}

impl AlternativeStrategy {
    /// Every strategy, highest priority first.
    pub const PRIORITY: [Self; 6] = [
        Self::ConsolidateIntoOneFile,
        Self::ReuseExistingCapability,
        Self::RemoveNewAbstraction,
        Self::RemoveBoilerplate,
        Self::PreferFunctionsOverClasses,
        Self::RequestBudgetIncrease,
    ];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsolidateIntoOneFile => "consolidate_into_one_file",
            Self::ReuseExistingCapability => "reuse_existing_capability",
            Self::RemoveNewAbstraction => "remove_new_abstraction",
            Self::RemoveBoilerplate => "remove_boilerplate",
            Self::PreferFunctionsOverClasses => "prefer_functions_over_classes",
            Self::RequestBudgetIncrease => "request_budget_increase",
        }
    }
}

impl fmt::Display for AlternativeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cheaper variant of a rejected action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    /// Strategy that produced it.
    pub strategy: AlternativeStrategy,
    /// Human-readable suggestion.
    pub description: String,
    /// Always strictly positive.
    pub cost_reduction: f64,
    /// Action to resubmit, absent for a budget increase request.
    pub revised_action: Option<Action>,
    /// Extra budget needed for the original action to pass.
    pub requested_increase: Option<f64>,
}
