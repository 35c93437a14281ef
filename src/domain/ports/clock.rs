//! Session clock port.

use std::time::Duration;

/// Elapsed wall-clock time since the session started.
pub trait SessionClock: Send + Sync {
    /// Time since the session started.
    fn elapsed(&self) -> Duration;
}
