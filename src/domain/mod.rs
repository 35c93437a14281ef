//! Domain layer: governance models, error taxonomy and collaborator ports.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    BudgetError, DomainError, DomainResult, GovernanceError, GovernanceResult, RollbackError,
};
