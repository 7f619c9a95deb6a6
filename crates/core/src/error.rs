//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business/domain failures. Infrastructure
/// concerns (connection loss, IO) belong to the store layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range request data (e.g. non-positive price or
    /// quantity, empty required text).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation was rejected because the target is in a state that
    /// forbids it (e.g. consuming materials on a finished work order).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced resource was not found. Carries the subject so a missing
    /// work order and a missing material stay distinguishable.
    #[error("{0} not found")]
    NotFound(String),

    /// A conflict occurred (e.g. duplicate unique name, blocked deletion).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(subject: impl Into<String>) -> Self {
        Self::NotFound(subject.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
