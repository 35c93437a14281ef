//! History sink port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::HistoryRecord;

/// Receives every decision, iteration and outcome of a session.
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Persist one record.
    async fn record(&self, record: &HistoryRecord) -> DomainResult<()>;
}
