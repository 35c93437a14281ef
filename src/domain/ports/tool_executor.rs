//! Tool execution port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Action;

/// Performs an approved action. Only ever called after an `Approved`
/// decision and, for mutating actions, after its checkpoint exists.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Carry the action out.
    async fn execute(&self, action: &Action) -> DomainResult<()>;
}
