//! Error types for the Shutterclub application layer

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] shutterclub_core::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Scheduling failed: {0}")]
    Scheduling(String),
}

impl AppError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Core(e) if e.is_retryable())
    }

    /// Failures that will recur however often the call is repeated
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AppError::Core(
                shutterclub_core::Error::Validation(_)
                    | shutterclub_core::Error::InvalidOperation(_)
                    | shutterclub_core::Error::NotFound { .. }
            ) | AppError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
