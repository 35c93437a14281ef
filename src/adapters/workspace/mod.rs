//! Workspace storage adapters.

pub mod filesystem;
pub mod memory;

pub use filesystem::FsWorkspace;
pub use memory::InMemoryWorkspace;
