//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading (`.warden/config.yaml`, `.warden/local.yaml`)
//! - `WARDEN_*` environment variable overrides
//! - Policy and logging validation

/// Figment-based loading and validation.
pub mod loader;
/// Serializable configuration structures.
pub mod settings;

pub use loader::{ConfigError, ConfigLoader};
pub use settings::{WardenConfig, WorkspaceConfig};
