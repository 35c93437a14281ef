//! Session usage accounting and terminal outcomes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::checkpoint::CheckpointId;
use super::decision::Alternative;
use super::iteration::Iteration;
use super::policy::SessionLimits;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// The session-wide limit that tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    /// Elapsed session time.
    WallClock,
    /// Model provider calls.
    ExternalCalls,
    /// Cumulative cost spent.
    Cost,
    /// Cumulative model tokens.
    Tokens,
}

impl LimitKind {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WallClock => "wall_clock",
            Self::ExternalCalls => "external_calls",
            Self::Cost => "cost",
            Self::Tokens => "tokens",
        }
    }
}

/// A limit together with how far it was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitBreach {
    /// Which limit.
    pub limit: LimitKind,
    /// Amount used when the breach was detected.
    pub used: f64,
    /// Configured maximum.
    pub max: f64,
}

impl fmt::Display for LimitBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            LimitKind::WallClock => write!(
                f,
                "session ran for {:.0}s, limit is {:.0}s",
                self.used, self.max
            ),
            LimitKind::ExternalCalls => write!(
                f,
                "external call limit of {:.0} reached ({:.0} made)",
                self.max, self.used
            ),
            LimitKind::Cost => write!(
                f,
                "spent {:.2} cost units, limit is {:.2}",
                self.used, self.max
            ),
            LimitKind::Tokens => write!(
                f,
                "used {:.0} tokens, limit is {:.0}",
                self.used, self.max
            ),
        }
    }
}

/// External call and token counters for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMeter {
    /// Calls admitted so far.
    pub external_calls: u64,
    /// Tokens reported so far.
    pub tokens: u64,
    /// Call limit copied from the policy.
    pub max_external_calls: u64,
    /// Token limit copied from the policy.
    pub max_tokens: u64,
}

impl UsageMeter {
    /// Zeroed counters with the policy's limits.
    pub fn new(limits: &SessionLimits) -> Self {
        Self {
            external_calls: 0,
            tokens: 0,
            max_external_calls: limits.max_external_calls,
            max_tokens: limits.max_tokens,
        }
    }

    /// Reserve one external call. Refused once the limit has been reached,
    /// so the call is never made.
    pub fn admit_call(&mut self) -> Result<(), LimitBreach> {
        if self.external_calls >= self.max_external_calls {
            return Err(LimitBreach {
                limit: LimitKind::ExternalCalls,
                used: self.external_calls as f64,
                max: self.max_external_calls as f64,
            });
        }
        self.external_calls += 1;
        Ok(())
    }

    /// Add tokens reported by a model call.
    pub fn record_tokens(&mut self, tokens: u64) {
        self.tokens = self.tokens.saturating_add(tokens);
    }

    /// Breach once more tokens were used than allowed.
    pub fn token_breach(&self) -> Option<LimitBreach> {
        (self.tokens > self.max_tokens).then(|| LimitBreach {
            limit: LimitKind::Tokens,
            used: self.tokens as f64,
            max: self.max_tokens as f64,
        })
    }

    /// Breach once the call limit has been reached.
    pub fn call_breach(&self) -> Option<LimitBreach> {
        (self.external_calls >= self.max_external_calls).then(|| LimitBreach {
            limit: LimitKind::ExternalCalls,
            used: self.external_calls as f64,
            max: self.max_external_calls as f64,
        })
    }
}

// ---------------------------------------------------------------------------
// Abandonment
// ---------------------------------------------------------------------------

/// Which no-progress condition the convergence detector saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StuckReason {
    /// The same non-empty issue set in every iteration of the window.
    RepeatedIssues {
        /// The recurring issue codes.
        codes: Vec<String>,
    },
    /// LOC delta barely moved across the window.
    FlatLocDelta {
        /// `max - min` of the window's LOC deltas.
        spread: i64,
    },
    /// Identical estimated cost in every iteration of the window.
    FlatCost {
        /// The repeated cost.
        cost: f64,
    },
}

impl fmt::Display for StuckReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepeatedIssues { codes } => {
                write!(f, "the same issues keep recurring ({})", codes.join(", "))
            }
            Self::FlatLocDelta { spread } => {
                write!(f, "LOC delta moved by only {spread} across the window")
            }
            Self::FlatCost { cost } => write!(f, "estimated cost stuck at {cost:.2}"),
        }
    }
}

/// Why the refinement loop gave up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AbandonReason {
    /// The convergence detector saw no progress.
    Stuck(StuckReason),
    /// Critical issues remained after the last allowed iteration.
    MaxIterations {
        /// The iteration limit.
        max: u32,
    },
    /// A session limit refused an external call mid-iteration.
    Interrupted(LimitBreach),
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stuck(reason) => write!(f, "no progress: {reason}"),
            Self::MaxIterations { max } => {
                write!(f, "critical issues remain after {max} iteration(s)")
            }
            Self::Interrupted(breach) => write!(f, "interrupted: {breach}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Terminal result of a session. Every variant carries a human-readable
/// reason and the best result available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The reviewer reported no critical issues.
    Completed {
        /// The final iteration.
        result: Iteration,
        /// Iterations run.
        iterations: u32,
    },
    /// Every planned action of an iteration was turned away.
    Rejected {
        /// Why the last action was rejected.
        reason: String,
        /// Alternatives offered for it.
        alternatives: Vec<Alternative>,
        /// Last completed iteration, if any.
        best_effort: Option<Iteration>,
    },
    /// The loop gave up.
    Abandoned {
        /// Why.
        reason: AbandonReason,
        /// Last completed iteration, if any.
        best_effort: Option<Iteration>,
        /// Checkpoint the workspace was restored to.
        restored_to: Option<CheckpointId>,
    },
    /// The wall-clock limit was reached.
    SessionTimeout {
        /// The limit that tripped.
        breach: LimitBreach,
        /// Session time when it tripped.
        elapsed: Duration,
        /// Last completed iteration, if any.
        best_effort: Option<Iteration>,
        /// Iteration-boundary checkpoint restored.
        restored_to: CheckpointId,
    },
    /// A call, cost or token limit was reached.
    SessionExhausted {
        /// The limit that tripped.
        breach: LimitBreach,
        /// Last completed iteration, if any.
        best_effort: Option<Iteration>,
        /// Iteration-boundary checkpoint restored.
        restored_to: CheckpointId,
    },
}

impl SessionOutcome {
    /// Stable snake_case name of the variant.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Rejected { .. } => "rejected",
            Self::Abandoned { .. } => "abandoned",
            Self::SessionTimeout { .. } => "session_timeout",
            Self::SessionExhausted { .. } => "session_exhausted",
        }
    }

    /// Human-readable reason.
    pub fn reason(&self) -> String {
        match self {
            Self::Completed { iterations, .. } => {
                format!("no critical issues after {iterations} iteration(s)")
            }
            Self::Rejected { reason, .. } => reason.clone(),
            Self::Abandoned { reason, .. } => reason.to_string(),
            Self::SessionTimeout { breach, .. } | Self::SessionExhausted { breach, .. } => {
                breach.to_string()
            }
        }
    }

    /// Best result available.
    pub fn best_effort(&self) -> Option<&Iteration> {
        match self {
            Self::Completed { result, .. } => Some(result),
            Self::Rejected { best_effort, .. }
            | Self::Abandoned { best_effort, .. }
            | Self::SessionTimeout { best_effort, .. }
            | Self::SessionExhausted { best_effort, .. } => best_effort.as_ref(),
        }
    }

    /// Alternatives carried by a rejection.
    pub fn alternatives(&self) -> &[Alternative] {
        match self {
            Self::Rejected { alternatives, .. } => alternatives,
            _ => &[],
        }
    }

    /// Whether the session completed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.reason())
    }
}
