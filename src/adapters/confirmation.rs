//! Non-interactive confirmation handlers.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::models::Confirmation;
use crate::domain::ports::{ConfirmationHandler, ConfirmationRequest};

/// Accepts every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationHandler for AutoConfirm {
    async fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        true
    }
}

/// Declines every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyConfirm;

#[async_trait]
impl ConfirmationHandler for DenyConfirm {
    async fn confirm(&self, request: &ConfirmationRequest) -> bool {
        debug!(tool = %request.action.tool, level = request.level.as_str(), "Confirmation declined");
        false
    }
}

/// Accepts plain confirmations and declines anything needing justification.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmOnly;

#[async_trait]
impl ConfirmationHandler for ConfirmOnly {
    async fn confirm(&self, request: &ConfirmationRequest) -> bool {
        request.level != Confirmation::Justify
    }
}
