//! Top-level orchestrator error.

use thiserror::Error;

use crate::config::ConfigError;
use crate::llm::{LlmError, TurnLoopError};
use crate::session::StoreError;

/// Errors surfaced across the orchestrator's public operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A required field was empty at the API boundary.
    #[error("{reason}")]
    Validation { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl OrchestratorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestratorError::Llm(e) if e.is_cancelled())
    }
}

impl From<TurnLoopError> for OrchestratorError {
    fn from(e: TurnLoopError) -> Self {
        OrchestratorError::Llm(e.error)
    }
}
