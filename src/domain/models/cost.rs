//! Priced cost of an action.

use serde::{Deserialize, Serialize};

/// Weighted cost of a single action. Always recomputed from the action and
/// the policy weights, never stored on the action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    /// LOC delta times its weight. Negative for net removals.
    pub loc: f64,
    /// New dependencies times their weight.
    pub dependencies: f64,
    /// New abstractions times their weight.
    pub abstractions: f64,
    /// Scaled security risk times its weight.
    pub security_risk: f64,
    /// Scaled tool risk times its weight.
    pub tool_risk: f64,
    /// Sum of the components.
    pub total: f64,
    /// `total / remaining`; absent when nothing remains.
    pub budget_utilization: Option<f64>,
}

impl Cost {
    /// A cost with every component at zero.
    pub fn zero() -> Self {
        Self {
            loc: 0.0,
            dependencies: 0.0,
            abstractions: 0.0,
            security_risk: 0.0,
            tool_risk: 0.0,
            total: 0.0,
            budget_utilization: None,
        }
    }

    /// Net removals price below zero and credit the budget.
    pub fn is_credit(&self) -> bool {
        self.total < 0.0
    }

    /// Component breakdown as `(label, value)` pairs, for display.
    pub fn components(&self) -> [(&'static str, f64); 5] {
        [
            ("loc", self.loc),
            ("dependencies", self.dependencies),
            ("abstractions", self.abstractions),
            ("security_risk", self.security_risk),
            ("tool_risk", self.tool_risk),
        ]
    }
}

impl std::fmt::Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.total)
    }
}
