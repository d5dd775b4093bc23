//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HubError`]
//! via `#[from]` when crossing a port boundary.

/// Top-level error returned by domain logic and port implementations.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A service call named a service the target does not implement.
    #[error("service {domain}.{service} is not supported")]
    UnsupportedService { domain: String, service: String },

    /// Failure inside the host runtime (event bus, dispatcher, …).
    #[error("runtime error")]
    Runtime(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid entity id {value:?}: {reason}")]
    InvalidEntityId { value: String, reason: &'static str },

    #[error("name must not be empty")]
    EmptyName,

    #[error("switch and feature entity must differ, both are {0}")]
    SameSourceEntity(String),

    #[error("scan interval must be greater than zero")]
    ZeroScanInterval,

    #[error("light {0} would publish over one of its own sources")]
    SelfReference(String),
}

/// A lookup that found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
