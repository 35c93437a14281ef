//! Confirmation port for approvals that need a human (or a stand-in).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::models::{Action, Confirmation, Cost};

/// An approval waiting on confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    /// The approved action.
    pub action: Action,
    /// Its debited cost.
    pub cost: Cost,
    /// Plain confirmation or justification.
    pub level: Confirmation,
}

/// Answers confirmation requests. The engine never blocks on its own; a
/// handler that cannot get an answer should decline.
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    /// Whether the action may go ahead.
    async fn confirm(&self, request: &ConfirmationRequest) -> bool;
}
