//! Configuration error types.

use thiserror::Error;

/// Errors from config document and service-catalog operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The supplied config or service payload is not valid JSON.
    #[error("invalid JSON in config: {reason}")]
    InvalidJson { reason: String },

    /// A required service field is missing or inconsistent.
    #[error("{reason}")]
    Validation { reason: String },

    /// The requested service id does not exist.
    #[error("service not found: {service_id}")]
    ServiceNotFound { service_id: String },

    /// Disk read/write failure while mirroring the document.
    #[error("config io error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io {
            reason: e.to_string(),
        }
    }
}
