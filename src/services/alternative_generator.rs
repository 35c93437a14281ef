//! Cheaper variants of over-budget actions.
//!
//! Strategies are tried in a fixed priority order and the first
//! `max_alternatives` that actually lower the cost are returned. Each
//! revised action is derived from the original, never from another
//! alternative, and its saving is measured with the session pricer.

use tracing::debug;

use crate::domain::models::{
    Action, Alternative, AlternativeSettings, AlternativeStrategy, Budget, Policy,
};

use super::cost_pricer::CostPricer;

/// Suggests bounded, cost-reducing revisions of a rejected action.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlternativeGenerator;

impl AlternativeGenerator {
    /// A generator with no extra state.
    pub fn new() -> Self {
        Self
    }

    /// Up to `policy.alternatives.max_alternatives` alternatives, each with
    /// a strictly positive cost reduction.
    pub fn suggest(&self, action: &Action, policy: &Policy, budget: &Budget) -> Vec<Alternative> {
        let pricer = CostPricer::from_policy(policy);
        let settings = &policy.alternatives;
        let original = pricer.price(action, budget).total;

        let mut out = Vec::with_capacity(settings.max_alternatives);
        for strategy in AlternativeStrategy::PRIORITY {
            if out.len() >= settings.max_alternatives {
                break;
            }
            let candidate = match strategy {
                AlternativeStrategy::RequestBudgetIncrease => {
                    budget_increase(original, budget, policy.thresholds.reject)
                }
                _ => revise(strategy, action, settings).map(|(revised, description)| {
                    let reduction = original - pricer.price(&revised, budget).total;
                    Alternative {
                        strategy,
                        description,
                        cost_reduction: reduction,
                        revised_action: Some(revised),
                        requested_increase: None,
                    }
                }),
            };
            if let Some(alt) = candidate.filter(|a| a.cost_reduction > 0.0) {
                out.push(alt);
            }
        }

        debug!(
            action_id = %action.id,
            original_cost = original,
            suggested = out.len(),
            "Generated alternatives"
        );
        out
    }
}

fn revise(
    strategy: AlternativeStrategy,
    action: &Action,
    settings: &AlternativeSettings,
) -> Option<(Action, String)> {
    let loc = action.estimated_loc_delta;
    match strategy {
        AlternativeStrategy::ConsolidateIntoOneFile => {
            let files = action.target_files.len();
            if files < 2 {
                return None;
            }
            let folded = i64::try_from(files - 1).unwrap_or(i64::MAX);
            let mut revised = action.derive();
            revised.estimated_loc_delta =
                loc - settings.per_file_overhead_loc.saturating_mul(folded);
            revised.target_files.truncate(1);
            Some((
                revised,
                format!("Put the change into a single file instead of {files}"),
            ))
        }
        AlternativeStrategy::ReuseExistingCapability => {
            if loc <= 0 {
                return None;
            }
            let mut revised = action.derive();
            revised.estimated_loc_delta = scale(loc, settings.reuse_retained_fraction);
            Some((
                revised,
                "Extend an existing function or module instead of writing new code".to_string(),
            ))
        }
        AlternativeStrategy::RemoveNewAbstraction => {
            if action.new_abstractions == 0 {
                return None;
            }
            let mut revised = action.derive();
            revised.new_abstractions = 0;
            Some((
                revised,
                format!(
                    "Drop the {} new abstraction(s) and inline the logic",
                    action.new_abstractions
                ),
            ))
        }
        AlternativeStrategy::RemoveBoilerplate => {
            if loc <= settings.min_boilerplate_loc {
                return None;
            }
            let mut revised = action.derive();
            revised.estimated_loc_delta = loc - scale(loc, settings.boilerplate_fraction);
            Some((
                revised,
                "Strip boilerplate, defensive scaffolding and redundant comments".to_string(),
            ))
        }
        AlternativeStrategy::PreferFunctionsOverClasses => {
            if action.new_abstractions == 0 {
                return None;
            }
            let mut revised = action.derive();
            revised.new_abstractions = action.new_abstractions / 2;
            revised.estimated_loc_delta = loc
                - settings
                    .function_savings_loc
                    .saturating_mul(i64::from(action.new_abstractions));
            Some((
                revised,
                "Use plain functions instead of new types where state is not needed".to_string(),
            ))
        }
        AlternativeStrategy::RequestBudgetIncrease => None,
    }
}

fn budget_increase(total: f64, budget: &Budget, reject: f64) -> Option<Alternative> {
    let shortfall = total - budget.remaining.min(reject);
    (shortfall > 0.0).then(|| Alternative {
        strategy: AlternativeStrategy::RequestBudgetIncrease,
        description: format!("Ask for {shortfall:.0} more cost units and keep the change as is"),
        cost_reduction: shortfall,
        revised_action: None,
        requested_increase: Some(shortfall),
    })
}

#[allow(clippy::cast_possible_truncation)]
fn scale(loc: i64, fraction: f64) -> i64 {
    (loc as f64 * fraction).round() as i64
}
