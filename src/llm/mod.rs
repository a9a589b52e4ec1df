//! LLM plumbing: wire types, dialect codecs, context truncation, the HTTP
//! client, system prompts, and the turn loop.

pub mod client;
pub mod context;
pub mod dialect;
pub mod errors;
pub mod prompt;
pub mod turn_loop;
pub mod types;

pub use client::LlmClient;
pub use dialect::Dialect;
pub use errors::LlmError;
pub use turn_loop::{run_tool_loop, TurnLoopError, TurnLoopOutput, MAX_TURNS};
pub use types::ApiMessage;
