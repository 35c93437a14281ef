//! Linear cost model for proposed actions.
//!
//! Every weight comes from the session policy. Net deletions price below
//! zero and are not floored, so a cleanup action credits the budget.

use crate::domain::models::{Action, Budget, Cost, CostWeights, Policy, SpecificationBudget};

/// Deterministic action pricer.
#[derive(Debug, Clone, Copy)]
pub struct CostPricer {
    weights: CostWeights,
}

impl CostPricer {
    /// A pricer using `weights`.
    pub fn new(weights: CostWeights) -> Self {
        Self { weights }
    }

    /// A pricer using the policy's cost weights.
    pub fn from_policy(policy: &Policy) -> Self {
        Self::new(policy.cost_weights)
    }

    /// Weights applied to each dimension.
    pub fn weights(&self) -> &CostWeights {
        &self.weights
    }

    /// Price `action` against the current budget.
    pub fn price(&self, action: &Action, budget: &Budget) -> Cost {
        let w = &self.weights;
        let loc = action.estimated_loc_delta as f64 * w.loc;
        let dependencies = action.new_dependencies.len() as f64 * w.dependency;
        let abstractions = f64::from(action.new_abstractions) * w.abstraction;
        let security_risk = action.security_risk * w.security * w.risk_scale;
        let tool_risk = action.tool_risk * w.tool * w.risk_scale;
        let total = loc + dependencies + abstractions + security_risk + tool_risk;

        let budget_utilization = (budget.remaining > 0.0).then(|| total / budget.remaining);

        Cost {
            loc,
            dependencies,
            abstractions,
            security_risk,
            tool_risk,
            total,
            budget_utilization,
        }
    }

    /// Price a specification's size envelope. New files are priced as new
    /// abstractions.
    pub fn price_envelope(&self, envelope: &SpecificationBudget) -> f64 {
        let w = &self.weights;
        f64::from(envelope.max_loc_delta) * w.loc
            + f64::from(envelope.max_new_dependencies) * w.dependency
            + f64::from(envelope.max_new_files) * w.abstraction
    }

    /// A session budget seeded from a specification envelope.
    pub fn budget_for(&self, envelope: &SpecificationBudget) -> Budget {
        Budget::new(self.price_envelope(envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pricer() -> CostPricer {
        CostPricer::new(CostWeights::default())
    }

    #[test]
    fn test_loc_only_price() {
        let cost = pricer().price(&Action::mutating("file_write").with_loc_delta(15), &Budget::new(1000.0));
        assert!((cost.total - 15.0).abs() < f64::EPSILON);
        assert!((cost.loc - 15.0).abs() < f64::EPSILON);
        assert_eq!(cost.budget_utilization, Some(0.015));
    }

    #[test]
    fn test_all_components_weighted() {
        let action = Action::mutating("file_write")
            .with_loc_delta(100)
            .with_dependencies(["serde", "tokio"])
            .with_abstractions(3)
            .with_risk(0.2, 0.4);
        let cost = pricer().price(&action, &Budget::new(10_000.0));

        assert!((cost.dependencies - 100.0).abs() < 1e-9);
        assert!((cost.abstractions - 60.0).abs() < 1e-9);
        assert!((cost.security_risk - 20.0).abs() < 1e-9);
        assert!((cost.tool_risk - 20.0).abs() < 1e-9);
        assert!((cost.total - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_delta_is_not_floored() {
        let cost = pricer().price(&Action::mutating("file_edit").with_loc_delta(-40), &Budget::new(100.0));
        assert!((cost.total + 40.0).abs() < f64::EPSILON);
        assert!(cost.is_credit());
    }

    #[test]
    fn test_utilization_absent_when_budget_empty() {
        let cost = pricer().price(&Action::mutating("file_write").with_loc_delta(1), &Budget::new(0.0));
        assert!(cost.budget_utilization.is_none());
    }

    #[test]
    fn test_custom_weights_are_used() {
        let weights = CostWeights {
            loc: 2.0,
            ..CostWeights::default()
        };
        let cost = CostPricer::new(weights).price(&Action::mutating("file_write").with_loc_delta(10), &Budget::new(100.0));
        assert!((cost.total - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_envelope_seeds_budget() {
        let envelope = SpecificationBudget {
            max_loc_delta: 500,
            max_new_files: 2,
            max_new_dependencies: 1,
        };
        let budget = pricer().budget_for(&envelope);
        assert!((budget.initial - 590.0).abs() < f64::EPSILON);
        assert!((budget.remaining - 590.0).abs() < f64::EPSILON);
    }
}
