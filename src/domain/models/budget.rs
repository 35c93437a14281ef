//! Session budget accounting.

use serde::{Deserialize, Serialize};

use crate::domain::errors::BudgetError;

/// Cost units available to a session.
///
/// `remaining` never goes negative: a debit that would overdraw is refused
/// with [`BudgetError::Overdraft`] and leaves the budget untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Amount the session started with.
    pub initial: f64,
    /// Amount still available.
    pub remaining: f64,
    /// Net amount debited so far.
    pub spent: f64,
}

impl Budget {
    /// A fresh budget. Negative or non-finite amounts start empty.
    pub fn new(initial: f64) -> Self {
        let initial = if initial.is_finite() { initial.max(0.0) } else { 0.0 };
        Self {
            initial,
            remaining: initial,
            spent: 0.0,
        }
    }

    /// Whether `amount` fits in what remains.
    pub fn can_afford(&self, amount: f64) -> bool {
        amount <= self.remaining
    }

    /// Take `amount` out of the budget. Negative amounts credit it.
    pub fn debit(&mut self, amount: f64) -> Result<(), BudgetError> {
        if !amount.is_finite() {
            return Err(BudgetError::NonFinite(amount));
        }
        if amount > self.remaining {
            return Err(BudgetError::Overdraft {
                requested: amount,
                remaining: self.remaining,
            });
        }
        self.remaining -= amount;
        self.spent += amount;
        Ok(())
    }

    /// Return a previous debit.
    pub fn refund(&mut self, amount: f64) -> Result<(), BudgetError> {
        if !amount.is_finite() {
            return Err(BudgetError::NonFinite(amount));
        }
        if self.remaining + amount < 0.0 {
            return Err(BudgetError::Overdraft {
                requested: -amount,
                remaining: self.remaining,
            });
        }
        self.remaining += amount;
        self.spent -= amount;
        Ok(())
    }

    /// Fraction of the initial budget spent so far.
    pub fn utilization(&self) -> f64 {
        if self.initial > 0.0 {
            self.spent / self.initial
        } else {
            0.0
        }
    }
}

/// Size envelope attached to a specification, used to seed a session
/// budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpecificationBudget {
    /// Largest net LOC change the specification allows.
    pub max_loc_delta: u32,
    /// New files the specification allows.
    pub max_new_files: u32,
    /// New dependencies the specification allows.
    pub max_new_dependencies: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_reduces_remaining() {
        let mut budget = Budget::new(100.0);
        budget.debit(40.0).unwrap();
        assert!((budget.remaining - 60.0).abs() < f64::EPSILON);
        assert!((budget.spent - 40.0).abs() < f64::EPSILON);
        assert!((budget.utilization() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_overdraft_leaves_budget_untouched() {
        let mut budget = Budget::new(10.0);
        let err = budget.debit(10.5).unwrap_err();
        assert!(matches!(err, BudgetError::Overdraft { .. }));
        assert!((budget.remaining - 10.0).abs() < f64::EPSILON);
        assert!(budget.spent.abs() < f64::EPSILON);
    }

    #[test]
    fn test_exact_debit_reaches_zero() {
        let mut budget = Budget::new(10.0);
        budget.debit(10.0).unwrap();
        assert!(budget.remaining.abs() < f64::EPSILON);
    }

    #[test]
    fn test_negative_debit_credits() {
        let mut budget = Budget::new(10.0);
        budget.debit(-5.0).unwrap();
        assert!((budget.remaining - 15.0).abs() < f64::EPSILON);
        assert!((budget.spent + 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_refund_round_trips_debit() {
        let mut budget = Budget::new(50.0);
        budget.debit(20.0).unwrap();
        budget.refund(20.0).unwrap();
        assert_eq!(budget, Budget::new(50.0));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut budget = Budget::new(50.0);
        assert_eq!(
            budget.debit(f64::NAN).unwrap_err().to_string(),
            BudgetError::NonFinite(f64::NAN).to_string()
        );
        assert!(budget.debit(f64::INFINITY).is_err());
    }

    #[test]
    fn test_new_clamps_negative() {
        let budget = Budget::new(-3.0);
        assert!(budget.remaining.abs() < f64::EPSILON);
    }
}
