//! Workspace storage port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::FileState;

/// Capture and restore of the tracked file state.
///
/// `restore` must be all-or-nothing: on error the workspace is left exactly
/// as it was before the call.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Read every tracked file.
    async fn capture(&self) -> DomainResult<FileState>;

    /// Make the tracked files match `state` exactly, removing tracked files
    /// that `state` does not contain.
    async fn restore(&self, state: &FileState) -> DomainResult<()>;
}
