//! # DomainError
//!
//! Centralized error handling for the marketplace.
//! Every port and service returns this type; the HTTP layer maps each
//! variant onto a status code.

use std::fmt::Display;
use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Referenced entity is absent (e.g., Property, Booking, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Malformed input (e.g., unknown role, unparsable booking date)
    #[error("validation error: {0}")]
    Validation(String),

    /// No session, expired session, or bad credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the wrong role or not the resource owner
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists (e.g., duplicate saved property, taken email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Underlying store failure (database, session backend, disk)
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl DomainError {
    pub fn not_found(entity: &str, id: impl Display) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn persistence(err: impl Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// A specialized Result type for marketplace logic.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DomainError::not_found("Property", 42);
        assert_eq!(err.to_string(), "Property not found with ID 42");
    }

    #[test]
    fn test_persistence_wraps_display() {
        let err = DomainError::persistence("connection reset");
        assert_eq!(err, DomainError::Persistence("connection reset".into()));
    }
}
