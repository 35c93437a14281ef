//! Append-only JSON Lines history file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::HistoryRecord;
use crate::domain::ports::HistorySink;

/// Writes one JSON record per line. Writes are serialized so lines never
/// interleave.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlHistory {
    /// History file at `path`; created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back, skipping blank lines.
    pub async fn read_all(&self) -> DomainResult<Vec<HistoryRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(DomainError::from))
            .collect()
    }
}

#[async_trait]
impl HistorySink for JsonlHistory {
    async fn record(&self, record: &HistoryRecord) -> DomainResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::HistoryWriteFailed(e.to_string()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DomainError::HistoryWriteFailed(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DomainError::HistoryWriteFailed(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| DomainError::HistoryWriteFailed(e.to_string()))
    }
}
