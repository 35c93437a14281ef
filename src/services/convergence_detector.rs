//! No-progress detection over the most recent iterations.

use crate::domain::models::{ConvergenceSettings, Iteration, StuckReason};

/// Decides whether the refinement loop has stopped making progress.
///
/// Only a full window is judged. Within it the loop is stuck when the same
/// non-empty issue set recurs in every iteration, when the LOC delta barely
/// moves, or when the estimated cost is identical throughout.
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceDetector {
    settings: ConvergenceSettings,
}

impl ConvergenceDetector {
    /// A detector using the policy's convergence settings.
    pub fn new(settings: ConvergenceSettings) -> Self {
        Self { settings }
    }

    /// True when `recent` shows no progress.
    pub fn is_stuck(&self, recent: &[Iteration]) -> bool {
        self.diagnose(recent).is_some()
    }

    /// Which no-progress condition fired, if any.
    pub fn diagnose(&self, recent: &[Iteration]) -> Option<StuckReason> {
        let window = self.settings.window.max(1);
        if recent.len() < window {
            return None;
        }
        let recent = &recent[recent.len() - window..];
        let first = &recent[0];

        let codes = first.issue_codes();
        if !codes.is_empty() && recent.iter().all(|it| it.issue_codes() == codes) {
            return Some(StuckReason::RepeatedIssues {
                codes: codes.into_iter().map(str::to_string).collect(),
            });
        }

        let (min, max) = recent
            .iter()
            .map(|it| it.loc_delta)
            .fold((i64::MAX, i64::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)));
        let spread = max.saturating_sub(min);
        if spread < self.settings.min_loc_spread {
            return Some(StuckReason::FlatLocDelta { spread });
        }

        #[allow(clippy::float_cmp)]
        let flat_cost = recent
            .iter()
            .all(|it| it.estimated_cost == first.estimated_cost);
        if flat_cost {
            return Some(StuckReason::FlatCost {
                cost: first.estimated_cost,
            });
        }

        None
    }
}

impl Default for ConvergenceDetector {
    fn default() -> Self {
        Self::new(ConvergenceSettings::default())
    }
}
