//! openspace-core — conversation orchestrator for the OpenSpace desktop
//! assistant.
//!
//! The crate accepts a user message in the context of a named session,
//! routes it to a configured LLM provider, and drives a bounded tool-use
//! loop (read file, list directory, search, run command, modify file,
//! manage the task list) until the model produces a terminal answer. Full
//! conversation state — messages, the raw request/response audit trail,
//! and the per-session todo list — persists to a single JSON file, and
//! in-flight generations are cooperatively cancellable per session.
//!
//! The desktop UI and the IPC bridge live outside this crate; they call
//! the [`Orchestrator`] operation surface with JSON-serializable inputs
//! and outputs.

pub mod cancel;
pub mod config;
pub mod llm;
pub mod orchestrator;
pub mod paths;
pub mod session;
pub mod tools;
pub mod workspace;

pub use config::CustomLLMService;
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use paths::DataPaths;
pub use session::{Message, Session, TodoItem};
pub use workspace::Workspace;

/// Initialize tracing with an env-filter (`RUST_LOG`) and sane defaults.
///
/// Call once from the embedding process; safe to skip in tests.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,openspace_core=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
