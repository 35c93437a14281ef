//! History sink adapters.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlHistory;
pub use memory::InMemoryHistory;
