//! In-memory workspace, used by tests and dry runs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::FileState;
use crate::domain::ports::WorkspaceStore;

/// Tracked files held in memory. Storage can be switched off to simulate an
/// unavailable backend.
#[derive(Debug)]
pub struct InMemoryWorkspace {
    state: RwLock<FileState>,
    available: AtomicBool,
}

impl Default for InMemoryWorkspace {
    fn default() -> Self {
        Self::new(FileState::default())
    }
}

impl InMemoryWorkspace {
    /// Workspace holding `initial`.
    pub fn new(initial: FileState) -> Self {
        Self {
            state: RwLock::new(initial),
            available: AtomicBool::new(true),
        }
    }

    /// Switch storage on or off.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Write one file, as a tool would.
    pub async fn write(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.state
            .write()
            .await
            .files
            .insert(path.into(), contents.into());
    }

    /// Delete one file. Returns whether it existed.
    pub async fn remove(&self, path: impl AsRef<Path>) -> bool {
        self.state.write().await.files.remove(path.as_ref()).is_some()
    }

    /// Contents of one file.
    pub async fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.state.read().await.files.get(path.as_ref()).cloned()
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> FileState {
        self.state.read().await.clone()
    }

    fn ensure_available(&self) -> DomainResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DomainError::StorageUnavailable(
                "in-memory workspace is offline".to_string(),
            ))
        }
    }
}

#[async_trait]
impl WorkspaceStore for InMemoryWorkspace {
    async fn capture(&self) -> DomainResult<FileState> {
        self.ensure_available()?;
        Ok(self.state.read().await.clone())
    }

    async fn restore(&self, state: &FileState) -> DomainResult<()> {
        self.ensure_available()?;
        *self.state.write().await = state.clone();
        Ok(())
    }
}
