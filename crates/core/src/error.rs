//! Error types for Shutterclub Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input rejected by a value object or entity constructor
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation would break a business invariant
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    /// The stored aggregate changed since it was loaded
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidOperation(message.into())
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Only optimistic-concurrency conflicts are worth retrying; validation
    /// and invariant failures are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
