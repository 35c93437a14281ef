//! Adapters for the engine's ports.

pub mod clock;
pub mod confirmation;
pub mod history;
pub mod workspace;

pub use clock::{ManualClock, MonotonicClock};
pub use confirmation::{AutoConfirm, ConfirmOnly, DenyConfirm};
pub use history::{InMemoryHistory, JsonlHistory};
pub use workspace::{FsWorkspace, InMemoryWorkspace};
