//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised on the domain-write path and by the event record store.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Domain input was rejected before anything was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// An entity snapshot or event payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store failed (connection loss, constraint violation, rollback).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// No event record exists with the given identifier.
    #[error("event record not found: {0}")]
    EventNotFound(Uuid),
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
