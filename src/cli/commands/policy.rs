//! Policy CLI commands.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::cli::display::{
    action_success, count_label, list_table, output, render_list, CommandOutput, DetailView,
};
use crate::cli::PolicyCommands;
use crate::domain::models::{PatternRule, Policy};
use crate::infrastructure::config::WardenConfig;

/// Result of `warden policy show`.
#[derive(Debug, Serialize)]
pub struct PolicyOutput {
    /// Effective policy.
    pub policy: Policy,
}

impl CommandOutput for PolicyOutput {
    fn to_human(&self) -> String {
        let p = &self.policy;
        let limits = &p.session_limits;
        let granted: Vec<String> = p.granted_tiers.iter().map(ToString::to_string).collect();

        let detail = DetailView::new("Governance policy")
            .section("Thresholds")
            .field("auto proceed", format!("< {}", p.thresholds.auto_proceed))
            .field("prompt", format!("<= {}", p.thresholds.prompt))
            .field("reject", format!("> {}", p.thresholds.reject))
            .section("Cost weights")
            .field("loc", p.cost_weights.loc)
            .field("dependency", p.cost_weights.dependency)
            .field("abstraction", p.cost_weights.abstraction)
            .field("security", p.cost_weights.security)
            .field("tool", p.cost_weights.tool)
            .field("risk scale", p.cost_weights.risk_scale)
            .section("Session limits")
            .field("duration", format!("{}s", limits.max_duration_secs))
            .field("external calls", limits.max_external_calls)
            .field("cost", limits.max_cost)
            .field("tokens", limits.max_tokens)
            .section("Refinement")
            .field("max iterations", p.refinement.max_iterations)
            .field("fix attempts", p.refinement.max_fix_attempts)
            .field("convergence window", p.convergence.window)
            .field("granted tiers", granted.join(", "))
            .field("privileged", p.allow_privileged)
            .render();

        let mut tools = list_table(&["tool", "tier"]);
        for (tool, tier) in &p.permission_tiers {
            tools.add_row(vec![tool.clone(), tier.to_string()]);
        }

        let mut patterns = list_table(&["name", "rule", "description"]);
        for pattern in &p.forbidden_patterns {
            patterns.add_row(vec![
                pattern.name.clone(),
                describe_rule(&pattern.rule),
                pattern.description.clone(),
            ]);
        }

        format!(
            "{detail}\n\n{}\n\n{}",
            render_list("tool", &tools, p.permission_tiers.len()),
            render_list("forbidden pattern", &patterns, p.forbidden_patterns.len())
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.policy).unwrap_or_default()
    }
}

/// Result of `warden policy check`.
#[derive(Debug, Serialize)]
pub struct PolicyCheckOutput {
    /// Whether validation passed.
    pub valid: bool,
    /// Where the configuration came from.
    pub source: String,
    /// Number of tool tier mappings.
    pub tools: usize,
    /// Number of forbidden patterns.
    pub forbidden_patterns: usize,
}

impl CommandOutput for PolicyCheckOutput {
    fn to_human(&self) -> String {
        action_success(&format!(
            "Configuration from {} is valid ({}, {})",
            self.source,
            count_label(self.tools, "tool", "tools"),
            count_label(self.forbidden_patterns, "forbidden pattern", "forbidden patterns"),
        ))
    }
}

/// Configuration has already been loaded and validated by the caller.
pub fn execute(
    command: &PolicyCommands,
    config: &WardenConfig,
    config_path: Option<&PathBuf>,
    json_mode: bool,
) -> Result<()> {
    match command {
        PolicyCommands::Show => output(
            &PolicyOutput {
                policy: config.policy.clone(),
            },
            json_mode,
        ),
        PolicyCommands::Check => output(
            &PolicyCheckOutput {
                valid: true,
                source: config_path.map_or_else(
                    || ".warden/ and WARDEN_* environment".to_string(),
                    |p| p.display().to_string(),
                ),
                tools: config.policy.permission_tiers.len(),
                forbidden_patterns: config.policy.forbidden_patterns.len(),
            },
            json_mode,
        ),
    }
    Ok(())
}

fn describe_rule(rule: &PatternRule) -> String {
    match rule {
        PatternRule::Tool { names } => format!("tool in [{}]", names.join(", ")),
        PatternRule::Path { glob } => format!("path matches {glob}"),
        PatternRule::Dependency { glob } => format!("dependency matches {glob}"),
        PatternRule::LocDeltaAbove { limit } => format!("loc delta > {limit}"),
        PatternRule::NewDependenciesAbove { limit } => format!("new dependencies > {limit}"),
        PatternRule::NewAbstractionsAbove { limit } => format!("new abstractions > {limit}"),
        PatternRule::SecurityRiskAbove { limit } => format!("security risk > {limit}"),
        PatternRule::ToolRiskAbove { limit } => format!("tool risk > {limit}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_show_lists_tools_and_patterns() {
        console::set_colors_enabled(false);
        let human = PolicyOutput {
            policy: Policy::default(),
        }
        .to_human();

        assert!(human.contains("Governance policy"));
        assert!(human.contains("file_delete"));
        assert!(human.contains("secret-files"));
    }

    #[test]
    fn test_policy_json_is_the_policy() {
        let json = PolicyOutput {
            policy: Policy::default(),
        }
        .to_json();
        assert_eq!(json["thresholds"]["reject"], 2000.0);
    }

    #[test]
    fn test_describe_rule() {
        assert_eq!(
            describe_rule(&PatternRule::Tool {
                names: vec!["git_push".into(), "file_delete".into()]
            }),
            "tool in [git_push, file_delete]"
        );
    }
}
