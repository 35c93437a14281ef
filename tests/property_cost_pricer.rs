use proptest::prelude::*;
use warden::domain::models::{Action, Budget, Policy};
use warden::services::{AlternativeGenerator, CostPricer};

fn arb_action() -> impl Strategy<Value = Action> {
    (
        -500i64..3000,
        0usize..6,
        0u32..8,
        1usize..5,
        0.0f64..=1.0,
        0.0f64..=1.0,
    )
        .prop_map(|(loc, deps, abstractions, files, security, tool)| {
            Action::mutating("file_write")
                .with_loc_delta(loc)
                .with_dependencies((0..deps).map(|i| format!("dep-{i}")))
                .with_abstractions(abstractions)
                .with_targets((0..files).map(|i| format!("src/m{i}.rs")))
                .with_risk(security, tool)
        })
}

proptest! {
    /// Property: the total is exactly the sum of the weighted components
    #[test]
    fn prop_total_is_sum_of_components(action in arb_action(), remaining in 0.0f64..5000.0) {
        let cost = CostPricer::from_policy(&Policy::default()).price(&action, &Budget::new(remaining));
        let sum: f64 = cost.components().iter().map(|(_, v)| v).sum();
        prop_assert!((cost.total - sum).abs() < 1e-6);
        prop_assert!(cost.total.is_finite());
    }

    /// Property: pricing never depends on the action id
    #[test]
    fn prop_price_ignores_identity(action in arb_action()) {
        let pricer = CostPricer::from_policy(&Policy::default());
        let budget = Budget::new(1000.0);
        prop_assert_eq!(
            pricer.price(&action, &budget).total,
            pricer.price(&action.derive(), &budget).total
        );
    }

    /// Property: adding lines never makes an action cheaper
    #[test]
    fn prop_price_monotone_in_loc(action in arb_action(), extra in 0i64..500) {
        let pricer = CostPricer::from_policy(&Policy::default());
        let budget = Budget::new(1000.0);
        let bigger = action.clone().with_loc_delta(action.estimated_loc_delta + extra);
        prop_assert!(pricer.price(&bigger, &budget).total >= pricer.price(&action, &budget).total);
    }

    /// Property: alternatives are bounded and every one saves something
    #[test]
    fn prop_alternatives_bounded_and_positive(action in arb_action(), remaining in 0.0f64..3000.0) {
        let policy = Policy::default();
        let alternatives = AlternativeGenerator::new().suggest(&action, &policy, &Budget::new(remaining));

        let total = CostPricer::from_policy(&policy).price(&action, &Budget::new(remaining)).total;
        if total > policy.thresholds.reject.min(remaining) {
            prop_assert!(!alternatives.is_empty());
        }
        prop_assert!(alternatives.len() <= policy.alternatives.max_alternatives);
        for alt in &alternatives {
            prop_assert!(alt.cost_reduction > 0.0);
            if let Some(revised) = &alt.revised_action {
                prop_assert_ne!(revised.id, action.id);
            }
        }
    }
}
