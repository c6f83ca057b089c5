//! Telemetry error types.

use thiserror::Error;
use warden_core::AuthError;

/// Errors raised while configuring logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The logging configuration is invalid (bad level, directive or format).
    #[error("invalid logging configuration: {0}")]
    ConfigError(String),

    /// A global subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    /// The log directory could not be prepared.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<TelemetryError> for AuthError {
    fn from(err: TelemetryError) -> Self {
        match err {
            TelemetryError::ConfigError(_) => Self::InvalidConfiguration(err.to_string()),
            TelemetryError::InitError(_) | TelemetryError::IoError(_) => Self::Internal(err.to_string()),
        }
    }
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
