//! Session store error types.

use thiserror::Error;

/// Errors from session persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested session id does not exist.
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Disk read/write failure.
    #[error("session store io error: {reason}")]
    Io { reason: String },

    /// The sessions file could not be encoded.
    #[error("session serialization error: {reason}")]
    Serialization { reason: String },
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization {
            reason: e.to_string(),
        }
    }
}
