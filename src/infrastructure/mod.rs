//! Infrastructure layer module
//!
//! - Configuration management (figment: YAML files plus `WARDEN_*` env)
//! - Logging infrastructure (tracing subscriber, rolling JSON files)

pub mod config;
pub mod logging;
