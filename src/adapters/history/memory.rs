//! In-memory history sink.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::HistoryRecord;
use crate::domain::ports::HistorySink;

/// Keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: RwLock<Vec<HistoryRecord>>,
}

impl InMemoryHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, in arrival order.
    pub async fn records(&self) -> Vec<HistoryRecord> {
        self.records.read().await.clone()
    }

    /// Records of one kind (`decision`, `iteration` or `outcome`).
    pub async fn of_kind(&self, kind: &str) -> Vec<HistoryRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect()
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether nothing has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl HistorySink for InMemoryHistory {
    async fn record(&self, record: &HistoryRecord) -> DomainResult<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }
}
