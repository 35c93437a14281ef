//! Refinement iterations and review findings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Severity of a review or verification finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Cosmetic or low impact.
    Minor,
    /// Worth fixing before completion.
    Significant,
    /// Blocks completion.
    Critical,
}

impl Severity {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Minor => "minor",
            Self::Significant => "significant",
            Self::Critical => "critical",
        }
    }
}

/// A single finding. `code` identifies the issue across iterations so the
/// convergence detector can compare issue sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issue {
    /// Stable identifier of the finding.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// How serious it is.
    pub severity: Severity,
}

impl Issue {
    /// A finding with the given severity.
    pub fn new(code: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity,
        }
    }

    /// A critical finding.
    pub fn critical(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Critical, message)
    }

    /// Whether the finding blocks completion.
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Record of one pass through Build -> Verify -> Review.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Iteration {
    /// Zero-based iteration number.
    pub index: u32,
    /// Findings in the order they were reported.
    pub issues: Vec<Issue>,
    /// Net LOC change of the approved actions.
    pub loc_delta: i64,
    /// Total cost of the approved actions.
    pub estimated_cost: f64,
    /// Actions the gates approved.
    pub approved_actions: u32,
    /// Actions the gates turned away.
    pub rejected_actions: u32,
    /// Verify -> Build retries used.
    pub fix_attempts: u32,
}

impl Iteration {
    /// Empty iteration with the given index.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Distinct issue codes.
    pub fn issue_codes(&self) -> BTreeSet<&str> {
        self.issues.iter().map(|i| i.code.as_str()).collect()
    }

    /// Whether any finding is critical.
    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(Issue::is_critical)
    }

    /// Number of critical findings.
    pub fn critical_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_critical()).count()
    }
}

/// Rolling window of the most recent iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationWindow {
    capacity: usize,
    items: Vec<Iteration>,
}

impl IterationWindow {
    /// Window holding at most `capacity` iterations (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: Vec::with_capacity(capacity.max(1)),
        }
    }

    /// Append, dropping the oldest iteration once full.
    pub fn push(&mut self, iteration: Iteration) {
        if self.items.len() == self.capacity {
            self.items.remove(0);
        }
        self.items.push(iteration);
    }

    /// Iterations, oldest first.
    pub fn as_slice(&self) -> &[Iteration] {
        &self.items
    }

    /// Most recent iteration.
    pub fn last(&self) -> Option<&Iteration> {
        self.items.last()
    }

    /// Number of iterations held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of iterations held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
