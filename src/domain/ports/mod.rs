//! Port trait definitions (Hexagonal Architecture)
//!
//! The engine talks to everything outside itself through these traits:
//! - ChangeAgent / Reviewer: model provider calls (metered)
//! - ToolExecutor: performs approved actions
//! - Verifier: runs the project's checks
//! - WorkspaceStore: capture/restore of tracked files
//! - HistorySink: decision, iteration and outcome records
//! - ConfirmationHandler: answers confirmation requests
//! - SessionClock: elapsed session time

pub mod change_agent;
pub mod clock;
pub mod confirmation;
pub mod history_sink;
pub mod tool_executor;
pub mod verifier;
pub mod workspace_store;

pub use change_agent::{AgentResponse, ChangeAgent, ModelUsage};
pub use clock::SessionClock;
pub use confirmation::{ConfirmationHandler, ConfirmationRequest};
pub use history_sink::HistorySink;
pub use tool_executor::ToolExecutor;
pub use verifier::{Review, Reviewer, Verification, Verifier};
pub use workspace_store::WorkspaceStore;
