//! Model-provider port for planning and revising changes.
//!
//! Every method is one external call and is admitted through the session
//! usage meter before it is made.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Action, Issue};

/// Tokens consumed by one model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Prompt plus completion tokens.
    pub tokens: u64,
}

/// Actions proposed by the agent together with what producing them cost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Proposed actions, in order.
    pub actions: Vec<Action>,
    /// What the call consumed.
    pub usage: ModelUsage,
}

impl AgentResponse {
    /// Response carrying `actions` and a token count.
    pub fn new(actions: Vec<Action>, tokens: u64) -> Self {
        Self {
            actions,
            usage: ModelUsage { tokens },
        }
    }
}

/// Produces the actions the loop builds, fixes and simplifies with.
#[async_trait]
pub trait ChangeAgent: Send + Sync {
    /// Initial plan for the first iteration.
    async fn plan(&self, iteration: u32) -> DomainResult<AgentResponse>;

    /// Actions addressing verification failures.
    async fn fix(&self, iteration: u32, failures: &[Issue]) -> DomainResult<AgentResponse>;

    /// Simpler actions addressing review findings, built by the next
    /// iteration.
    async fn simplify(&self, iteration: u32, issues: &[Issue]) -> DomainResult<AgentResponse>;
}
