//! LLM call error types.

use thiserror::Error;

/// Errors from provider calls and the turn loop.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP dial/read failure before a response body was obtained.
    #[error("request failed: {reason}")]
    Transport { reason: String },

    /// Non-2xx response. `detail` carries the body plus the sanitized
    /// request headers and bodies for offline diagnosis.
    #[error("API request failed with status {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The response body did not have the expected provider shape.
    #[error("failed to parse response: {reason}")]
    Parse { reason: String },

    /// The provider produced neither text nor tool calls.
    #[error("empty response from service (provider: {provider}){detail}")]
    EmptyResponse { provider: String, detail: String },

    /// The ambient cancellation context fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl LlmError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LlmError::Cancelled)
    }
}
