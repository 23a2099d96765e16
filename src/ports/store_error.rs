//! Error type shared by the persistence ports.

use thiserror::Error;

/// Persistence failures. Every variant is recoverable from the exchange's
/// point of view; callers decide whether to retry, degrade or abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }

    pub fn database(message: impl Into<String>) -> Self {
        StoreError::Database(message.into())
    }

    /// True for failures a retry might clear.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Unavailable(_))
    }
}
