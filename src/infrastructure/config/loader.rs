use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::{PatternRule, PermissionTier, Policy, WORKSPACE_ESCAPE_PATTERN};
use crate::domain::models::policy::compile_glob;
use crate::infrastructure::logging::logger::parse_log_level;

use super::settings::WardenConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Invalid thresholds: need 0 <= auto_proceed ({auto_proceed}) <= prompt ({prompt}) <= reject ({reject})"
    )]
    /// Gate thresholds are out of order.
    InvalidThresholds {
        /// Configured auto-proceed threshold.
        auto_proceed: f64,
        /// Configured prompt threshold.
        prompt: f64,
        /// Configured reject threshold.
        reject: f64,
    },

    #[error("Invalid cost weight '{name}': {value}. Must be finite and non-negative")]
    /// A cost weight is negative or not finite.
    InvalidWeight {
        /// Weight name.
        name: &'static str,
        /// Configured value.
        value: f64,
    },

    #[error("Invalid permission tier {tier} for tool '{tool}'. Must be between 0 and 3")]
    /// A tool is mapped to an unknown tier.
    InvalidToolTier {
        /// Tool name.
        tool: String,
        /// Configured tier.
        tier: u8,
    },

    #[error("Invalid granted tier {0}. Must be between 0 and 3")]
    /// A granted tier is unknown.
    InvalidGrantedTier(u8),

    #[error("Invalid session limit '{0}'. Must be positive")]
    /// A session limit is zero.
    InvalidSessionLimit(&'static str),

    #[error("Invalid max_iterations: {0}. Must be at least 1")]
    /// The iteration cap is zero.
    InvalidMaxIterations(u32),

    #[error("Review strictness schedule cannot be empty")]
    /// No review strictness levels were given.
    EmptyStrictnessSchedule,

    #[error("Invalid convergence window: {0}. Must be at least 1")]
    /// The convergence window is zero.
    InvalidConvergenceWindow(usize),

    #[error("Forbidden pattern '{name}' has an invalid glob '{glob}'")]
    /// A forbidden pattern glob does not compile.
    InvalidGlob {
        /// Pattern name.
        name: String,
        /// Offending glob.
        glob: String,
    },

    #[error("Forbidden pattern '{name}' has risk limit {limit}. Must be between 0 and 1")]
    /// A forbidden pattern risk limit is outside `0..=1`.
    InvalidRiskLimit {
        /// Pattern name.
        name: String,
        /// Configured limit.
        limit: f64,
    },

    #[error("Forbidden pattern names must be unique, non-empty and not reserved, got '{0}'")]
    /// A forbidden pattern name is empty, duplicated or reserved.
    InvalidPatternName(String),

    #[error("Invalid alternatives setting '{0}'")]
    /// An alternatives setting is zero or inconsistent.
    InvalidAlternatives(&'static str),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    /// The log level is not recognised.
    InvalidLogLevel(String),

    #[error("Invalid workspace glob '{0}'")]
    /// A workspace include or exclude glob does not compile.
    InvalidWorkspaceGlob(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .warden/config.yaml (project config)
    /// 3. .warden/local.yaml (local overrides, optional)
    /// 4. Environment variables (WARDEN_* prefix, `__` for nesting)
    pub fn load() -> Result<WardenConfig> {
        Self::load_from_dir(".")
    }

    /// Load configuration for a project rooted at `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<WardenConfig> {
        let dir = root.as_ref().join(".warden");
        let config: WardenConfig = Figment::new()
            .merge(Serialized::defaults(WardenConfig::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("WARDEN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file (no environment overrides).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<WardenConfig> {
        let config: WardenConfig = Figment::new()
            .merge(Serialized::defaults(WardenConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &WardenConfig) -> Result<(), ConfigError> {
        Self::validate_policy(&config.policy)?;

        if parse_log_level(&config.logging.level).is_err() {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        for glob in config
            .workspace
            .include
            .iter()
            .chain(&config.workspace.exclude)
        {
            if compile_glob(glob).is_none() {
                return Err(ConfigError::InvalidWorkspaceGlob(glob.clone()));
            }
        }

        Ok(())
    }

    /// Validate a policy on its own.
    pub fn validate_policy(policy: &Policy) -> Result<(), ConfigError> {
        // Thresholds
        let t = &policy.thresholds;
        let ordered = t.auto_proceed >= 0.0 && t.auto_proceed <= t.prompt && t.prompt <= t.reject;
        if !ordered || !t.reject.is_finite() {
            return Err(ConfigError::InvalidThresholds {
                auto_proceed: t.auto_proceed,
                prompt: t.prompt,
                reject: t.reject,
            });
        }

        // Weights
        let w = &policy.cost_weights;
        for (name, value) in [
            ("loc", w.loc),
            ("dependency", w.dependency),
            ("abstraction", w.abstraction),
            ("security", w.security),
            ("tool", w.tool),
            ("risk_scale", w.risk_scale),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        // Permission tiers
        for (tool, tier) in &policy.permission_tiers {
            if *tier > PermissionTier::PRIVILEGED {
                return Err(ConfigError::InvalidToolTier {
                    tool: tool.clone(),
                    tier: tier.0,
                });
            }
        }
        if let Some(tier) = policy
            .granted_tiers
            .iter()
            .find(|t| **t > PermissionTier::PRIVILEGED)
        {
            return Err(ConfigError::InvalidGrantedTier(tier.0));
        }

        // Session limits
        let limits = &policy.session_limits;
        if limits.max_duration_secs == 0 {
            return Err(ConfigError::InvalidSessionLimit("max_duration_secs"));
        }
        if limits.max_external_calls == 0 {
            return Err(ConfigError::InvalidSessionLimit("max_external_calls"));
        }
        if !(limits.max_cost.is_finite() && limits.max_cost > 0.0) {
            return Err(ConfigError::InvalidSessionLimit("max_cost"));
        }
        if limits.max_tokens == 0 {
            return Err(ConfigError::InvalidSessionLimit("max_tokens"));
        }

        // Refinement and convergence
        if policy.refinement.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(
                policy.refinement.max_iterations,
            ));
        }
        if policy.refinement.strictness.is_empty() {
            return Err(ConfigError::EmptyStrictnessSchedule);
        }
        if policy.convergence.window == 0 {
            return Err(ConfigError::InvalidConvergenceWindow(policy.convergence.window));
        }

        // Alternatives
        let alt = &policy.alternatives;
        if alt.max_alternatives == 0 || alt.max_alternatives > 3 {
            return Err(ConfigError::InvalidAlternatives("max_alternatives"));
        }
        if !(0.0..1.0).contains(&alt.reuse_retained_fraction) {
            return Err(ConfigError::InvalidAlternatives("reuse_retained_fraction"));
        }
        if !(alt.boilerplate_fraction > 0.0 && alt.boilerplate_fraction < 1.0) {
            return Err(ConfigError::InvalidAlternatives("boilerplate_fraction"));
        }
        if alt.per_file_overhead_loc < 0 || alt.function_savings_loc < 0 {
            return Err(ConfigError::InvalidAlternatives("loc savings"));
        }

        // Forbidden patterns
        let mut seen = std::collections::HashSet::new();
        for pattern in &policy.forbidden_patterns {
            if pattern.name.trim().is_empty()
                || pattern.name == WORKSPACE_ESCAPE_PATTERN
                || !seen.insert(pattern.name.as_str())
            {
                return Err(ConfigError::InvalidPatternName(pattern.name.clone()));
            }
            match &pattern.rule {
                PatternRule::Path { glob } | PatternRule::Dependency { glob } => {
                    if compile_glob(glob).is_none() {
                        return Err(ConfigError::InvalidGlob {
                            name: pattern.name.clone(),
                            glob: glob.clone(),
                        });
                    }
                }
                PatternRule::SecurityRiskAbove { limit } | PatternRule::ToolRiskAbove { limit } => {
                    if !(0.0..=1.0).contains(limit) {
                        return Err(ConfigError::InvalidRiskLimit {
                            name: pattern.name.clone(),
                            limit: *limit,
                        });
                    }
                }
                PatternRule::Tool { .. }
                | PatternRule::LocDeltaAbove { .. }
                | PatternRule::NewDependenciesAbove { .. }
                | PatternRule::NewAbstractionsAbove { .. } => {}
            }
        }

        Ok(())
    }
}
