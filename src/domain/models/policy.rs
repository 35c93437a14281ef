//! Session governance policy.
//!
//! A [`Policy`] is loaded once at session start and never mutated by the
//! engine. Every numeric threshold the gates, the refinement loop and the
//! session governor use lives here, so that callers can derive them however
//! they like (static YAML, learned weights, a stricter policy scoped to the
//! engine's own source tree) without touching the gate code.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};

use super::action::{Action, ActionKind};
use super::iteration::Severity;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Immutable per-session governance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Policy {
    /// Cost thresholds used by the budget gate.
    #[serde(default)]
    pub thresholds: GateThresholds,

    /// Weight table consumed by the cost pricer.
    #[serde(default)]
    pub cost_weights: CostWeights,

    /// Named predicates that reject an action outright.
    #[serde(default = "default_forbidden_patterns")]
    pub forbidden_patterns: Vec<ForbiddenPattern>,

    /// Tool name to permission tier (0-3).
    #[serde(default = "default_permission_tiers")]
    pub permission_tiers: BTreeMap<String, PermissionTier>,

    /// Tiers this session is allowed to use.
    #[serde(default = "default_granted_tiers")]
    pub granted_tiers: BTreeSet<PermissionTier>,

    /// Tier 3 tools are rejected unless this is set, even when granted.
    #[serde(default)]
    pub allow_privileged: bool,

    /// Extra per-phase tool deny lists, on top of the capability table.
    #[serde(default)]
    pub phase_denied_tools: BTreeMap<ExecutionPhase, BTreeSet<String>>,

    /// Session-wide circuit breaker limits.
    #[serde(default)]
    pub session_limits: SessionLimits,

    /// Refinement loop bounds.
    #[serde(default)]
    pub refinement: RefinementSettings,

    /// Convergence detector tuning.
    #[serde(default)]
    pub convergence: ConvergenceSettings,

    /// Alternative generator tuning.
    #[serde(default)]
    pub alternatives: AlternativeSettings,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            thresholds: GateThresholds::default(),
            cost_weights: CostWeights::default(),
            forbidden_patterns: default_forbidden_patterns(),
            permission_tiers: default_permission_tiers(),
            granted_tiers: default_granted_tiers(),
            allow_privileged: false,
            phase_denied_tools: BTreeMap::new(),
            session_limits: SessionLimits::default(),
            refinement: RefinementSettings::default(),
            convergence: ConvergenceSettings::default(),
            alternatives: AlternativeSettings::default(),
        }
    }
}

impl Policy {
    /// Permission tier registered for `tool`, if any.
    pub fn tier_of(&self, tool: &str) -> Option<PermissionTier> {
        self.permission_tiers.get(tool).copied()
    }

    /// Whether the phase table allows `tool` of the given kind in `phase`.
    pub fn phase_permits(&self, phase: ExecutionPhase, tool: &str, kind: ActionKind) -> bool {
        if !phase.permits(kind) {
            return false;
        }
        !self
            .phase_denied_tools
            .get(&phase)
            .is_some_and(|denied| denied.contains(tool))
    }

    /// Register a tool at the given tier. Intended for building policies in
    /// code; loaded policies are never mutated by the engine.
    pub fn with_tool(mut self, tool: impl Into<String>, tier: u8) -> Self {
        self.permission_tiers.insert(tool.into(), PermissionTier(tier));
        self
    }

    /// Replace the gate thresholds.
    pub fn with_thresholds(mut self, auto_proceed: f64, prompt: f64, reject: f64) -> Self {
        self.thresholds = GateThresholds {
            auto_proceed,
            prompt,
            reject,
        };
        self
    }
}

// ---------------------------------------------------------------------------
// Thresholds and weights
// ---------------------------------------------------------------------------

/// Cost thresholds for the budget gate.
///
/// `total < auto_proceed` is approved silently, `auto_proceed..=prompt`
/// needs confirmation, `prompt..=reject` needs justification, and anything
/// above `reject` is sent back with alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    /// Below this, approvals need no confirmation.
    #[serde(default = "default_auto_proceed")]
    pub auto_proceed: f64,
    /// Up to this, approvals need a plain confirmation.
    #[serde(default = "default_prompt")]
    pub prompt: f64,
    /// Above this, actions are sent back with alternatives.
    #[serde(default = "default_reject")]
    pub reject: f64,
}

fn default_auto_proceed() -> f64 {
    300.0
}

fn default_prompt() -> f64 {
    800.0
}

fn default_reject() -> f64 {
    2000.0
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            auto_proceed: default_auto_proceed(),
            prompt: default_prompt(),
            reject: default_reject(),
        }
    }
}

/// Weight table for the linear cost model.
///
/// Risk components are scaled by `risk_scale` so that a `0..=1` risk score
/// lands in the same range as LOC-derived costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostWeights {
    /// Per line of LOC delta.
    pub loc: f64,
    /// Per new dependency.
    pub dependency: f64,
    /// Per new abstraction.
    pub abstraction: f64,
    /// Per unit of scaled security risk.
    pub security: f64,
    /// Per unit of scaled tool risk.
    pub tool: f64,
    /// Multiplier applied to the 0-1 risk scores.
    pub risk_scale: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            loc: 1.0,
            dependency: 50.0,
            abstraction: 20.0,
            security: 1.0,
            tool: 0.5,
            risk_scale: 100.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Permissions and phases
// ---------------------------------------------------------------------------

/// Permission tier of a tool, 0 (harmless) to 3 (privileged).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTier(pub u8);

impl PermissionTier {
    /// Read-only tools.
    pub const READ: Self = Self(0);
    /// Tools that edit tracked files.
    pub const WRITE: Self = Self(1);
    /// Tools that run commands or reach the network.
    pub const EXECUTE: Self = Self(2);
    /// Destructive or irreversible tools.
    pub const PRIVILEGED: Self = Self(3);

    /// Whether this is tier 3.
    pub fn is_privileged(self) -> bool {
        self >= Self::PRIVILEGED
    }
}

impl std::fmt::Display for PermissionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier {}", self.0)
    }
}

fn default_permission_tiers() -> BTreeMap<String, PermissionTier> {
    [
        ("file_read", PermissionTier::READ),
        ("grep_search", PermissionTier::READ),
        ("semantic_search", PermissionTier::READ),
        ("file_write", PermissionTier::WRITE),
        ("file_edit", PermissionTier::WRITE),
        ("test_runner", PermissionTier::WRITE),
        ("shell", PermissionTier::EXECUTE),
        ("git", PermissionTier::EXECUTE),
        ("web_fetch", PermissionTier::EXECUTE),
        ("file_delete", PermissionTier::PRIVILEGED),
        ("git_push", PermissionTier::PRIVILEGED),
    ]
    .into_iter()
    .map(|(name, tier)| (name.to_string(), tier))
    .collect()
}

fn default_granted_tiers() -> BTreeSet<PermissionTier> {
    [
        PermissionTier::READ,
        PermissionTier::WRITE,
        PermissionTier::EXECUTE,
    ]
    .into_iter()
    .collect()
}

/// Execution phase of the session, used by the phase/capability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    /// Read-only context gathering and planning.
    Gather,
    /// Mutations allowed.
    Act,
    /// Read-only verification and review.
    Verify,
}

impl ExecutionPhase {
    /// Capability table: only `Act` admits mutating actions.
    pub fn permits(self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::ReadOnly => true,
            ActionKind::Mutating => self == Self::Act,
        }
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gather => "gather",
            Self::Act => "act",
            Self::Verify => "verify",
        }
    }
}

impl std::fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gather" => Ok(Self::Gather),
            "act" => Ok(Self::Act),
            "verify" => Ok(Self::Verify),
            other => Err(format!("unknown phase '{other}' (expected gather, act or verify)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Forbidden patterns
// ---------------------------------------------------------------------------

/// Name reported by the safety gate for a target outside the workspace root.
/// The check is built in and runs whatever patterns the policy lists.
pub const WORKSPACE_ESCAPE_PATTERN: &str = "workspace-escape";

/// A named predicate over an action. Any match rejects the action at the
/// safety gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenPattern {
    /// Name reported when the pattern matches.
    pub name: String,
    /// What the pattern guards against.
    #[serde(default)]
    pub description: String,
    /// The predicate.
    pub rule: PatternRule,
}

/// The predicate behind a [`ForbiddenPattern`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternRule {
    /// The action uses one of these tools.
    Tool {
        /// Tool names, compared case-insensitively.
        names: Vec<String>,
    },
    /// A target file matches the glob.
    Path {
        /// Glob over workspace-relative paths.
        glob: String,
    },
    /// A new dependency matches the glob.
    Dependency {
        /// Glob over dependency names.
        glob: String,
    },
    /// The LOC delta is above the limit.
    LocDeltaAbove {
        /// Largest allowed delta.
        limit: i64,
    },
    /// More new dependencies than the limit.
    NewDependenciesAbove {
        /// Largest allowed count.
        limit: usize,
    },
    /// More new abstractions than the limit.
    NewAbstractionsAbove {
        /// Largest allowed count.
        limit: u32,
    },
    /// Security risk above the limit.
    SecurityRiskAbove {
        /// Largest allowed score, 0 to 1.
        limit: f64,
    },
    /// Tool risk above the limit.
    ToolRiskAbove {
        /// Largest allowed score, 0 to 1.
        limit: f64,
    },
}

impl ForbiddenPattern {
    /// A pattern with no description.
    pub fn new(name: impl Into<String>, rule: PatternRule) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            rule,
        }
    }

    /// Whether the action violates this pattern.
    ///
    /// An uncompilable glob counts as a match: the loader rejects such
    /// policies, and a policy built in code must not fail open.
    pub fn matches(&self, action: &Action) -> bool {
        match &self.rule {
            PatternRule::Tool { names } => names.iter().any(|n| n.eq_ignore_ascii_case(&action.tool)),
            PatternRule::Path { glob } => match compile_glob(glob) {
                Some(matcher) => action
                    .target_files
                    .iter()
                    .any(|p| matcher.is_match(normalize(p))),
                None => true,
            },
            PatternRule::Dependency { glob } => match compile_glob(glob) {
                Some(matcher) => action.new_dependencies.iter().any(|d| matcher.is_match(d)),
                None => true,
            },
            PatternRule::LocDeltaAbove { limit } => action.estimated_loc_delta > *limit,
            PatternRule::NewDependenciesAbove { limit } => action.new_dependencies.len() > *limit,
            PatternRule::NewAbstractionsAbove { limit } => action.new_abstractions > *limit,
            PatternRule::SecurityRiskAbove { limit } => action.security_risk > *limit,
            PatternRule::ToolRiskAbove { limit } => action.tool_risk > *limit,
        }
    }
}

/// Compile a glob, returning `None` when it is malformed.
pub fn compile_glob(pattern: &str) -> Option<GlobMatcher> {
    Glob::new(pattern).ok().map(|g| g.compile_matcher())
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn default_forbidden_patterns() -> Vec<ForbiddenPattern> {
    vec![
        ForbiddenPattern {
            name: "secret-files".to_string(),
            description: "Environment files and private keys are never touched".to_string(),
            rule: PatternRule::Path {
                glob: "**/{.env,*.key,*.pem}".to_string(),
            },
        },
        ForbiddenPattern {
            name: "secrets-directory".to_string(),
            description: "Anything under a secrets/ directory".to_string(),
            rule: PatternRule::Path {
                glob: "**/secrets/**".to_string(),
            },
        },
        ForbiddenPattern {
            name: "extreme-security-risk".to_string(),
            description: "Actions the planner itself rates as near-certainly unsafe".to_string(),
            rule: PatternRule::SecurityRiskAbove { limit: 0.9 },
        },
    ]
}

// ---------------------------------------------------------------------------
// Session limits and loop settings
// ---------------------------------------------------------------------------

/// Hard outer bounds enforced by the session governor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionLimits {
    /// Wall-clock limit in seconds.
    pub max_duration_secs: u64,
    /// Model provider calls allowed.
    pub max_external_calls: u64,
    /// Cumulative cost allowed.
    pub max_cost: f64,
    /// Cumulative model tokens allowed.
    pub max_tokens: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_duration_secs: 30 * 60,
            max_external_calls: 50,
            max_cost: 5000.0,
            max_tokens: 500_000,
        }
    }
}

impl SessionLimits {
    /// Wall-clock limit as a `Duration`.
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

/// Bounds for the Build -> Verify -> Review -> Simplify loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementSettings {
    /// Iterations before the loop abandons.
    pub max_iterations: u32,
    /// Verify -> Build retries allowed inside one iteration.
    pub max_fix_attempts: u32,
    /// Minimum severity reported by review, indexed by iteration. The last
    /// entry applies to every later iteration.
    pub strictness: Vec<Severity>,
    /// Resubmit an alternative's revised action when the original is sent
    /// back over budget.
    pub auto_resubmit_alternatives: bool,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            max_fix_attempts: 2,
            strictness: vec![Severity::Info, Severity::Significant, Severity::Critical],
            auto_resubmit_alternatives: true,
        }
    }
}

impl RefinementSettings {
    /// Minimum severity the reviewer reports on the given iteration.
    pub fn strictness_for(&self, iteration: u32) -> Severity {
        self.strictness
            .get(iteration as usize)
            .or_else(|| self.strictness.last())
            .copied()
            .unwrap_or(Severity::Critical)
    }
}

/// Convergence detector tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceSettings {
    /// Number of most recent iterations inspected.
    pub window: usize,
    /// Spread of `loc_delta` below which the window shows no progress.
    pub min_loc_spread: i64,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            window: 3,
            min_loc_spread: 5,
        }
    }
}

/// Alternative generator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlternativeSettings {
    /// Alternatives offered per rejection.
    pub max_alternatives: usize,
    /// LOC saved per file folded into a single file.
    pub per_file_overhead_loc: i64,
    /// Fraction of the LOC delta still written when reusing existing code.
    pub reuse_retained_fraction: f64,
    /// Fraction of the LOC delta treated as boilerplate.
    pub boilerplate_fraction: f64,
    /// Changes smaller than this have no boilerplate worth removing.
    pub min_boilerplate_loc: i64,
    /// LOC saved per class rewritten as free functions.
    pub function_savings_loc: i64,
}

impl Default for AlternativeSettings {
    fn default() -> Self {
        Self {
            max_alternatives: 3,
            per_file_overhead_loc: 15,
            reuse_retained_fraction: 0.5,
            boilerplate_fraction: 0.2,
            min_boilerplate_loc: 50,
            function_savings_loc: 10,
        }
    }
}
