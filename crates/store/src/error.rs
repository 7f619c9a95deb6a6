//! Store error model: domain failures pass through, backend failures are
//! wrapped.

use thiserror::Error;

use oficina_core::DomainError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A deterministic domain failure surfaced through the store (not found,
    /// conflict, guard rejection, invalid input).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The storage backend itself failed (connection loss, corrupt row).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}
