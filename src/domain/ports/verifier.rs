//! Verification and review ports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::Issue;

use super::change_agent::ModelUsage;

/// Result of running the project's checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    /// Failing checks; empty when everything passed.
    pub failures: Vec<Issue>,
}

impl Verification {
    /// All checks passed.
    pub fn passed() -> Self {
        Self::default()
    }

    /// Some checks failed.
    pub fn failed(failures: Vec<Issue>) -> Self {
        Self { failures }
    }

    /// Whether no check failed.
    pub fn is_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs tests, linters and type checks. Local, not metered.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Run every check.
    async fn verify(&self) -> DomainResult<Verification>;
}

/// Findings reported by a review call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Findings at or above the requested severity.
    pub issues: Vec<Issue>,
    /// What the call consumed.
    pub usage: ModelUsage,
}

/// Reviews the workspace after a verified build. One external call.
#[async_trait]
pub trait Reviewer: Send + Sync {
    /// Review the workspace for the given iteration.
    async fn review(&self, iteration: u32) -> DomainResult<Review>;
}
