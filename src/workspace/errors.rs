//! Workspace error types.

use thiserror::Error;

/// Errors from file operations and command execution.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("path parameter is required")]
    MissingPath,

    #[error("query parameter is required")]
    MissingQuery,

    #[error("command parameter is required")]
    MissingCommand,

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {reason}")]
    Io { reason: String },

    #[error("command execution failed: {reason}")]
    Command { reason: String },
}

impl From<std::io::Error> for WorkspaceError {
    fn from(e: std::io::Error) -> Self {
        WorkspaceError::Io {
            reason: e.to_string(),
        }
    }
}
