//! Orchestrator — the public entry point.
//!
//! Wires the session store, config document, cancel registry, tool
//! catalog, workspace, and LLM client together, and exposes the operation
//! surface the IPC bridge calls: session CRUD, message sending with the
//! tool-use loop, summarization, abort, and provider/service management.

pub mod chat;
pub mod errors;

use std::sync::Arc;

use serde_json::{json, Value};

use crate::cancel::CancelRegistry;
use crate::config::{ConfigStore, CustomLLMService};
use crate::llm::LlmClient;
use crate::paths::DataPaths;
use crate::session::{
    Message, Session, SessionChild, SessionStore, TodoItem,
};
use crate::tools::{ToolCtx, ToolRegistry};
use crate::workspace::{CommandRunner, ShellRunner, Workspace};

pub use errors::OrchestratorError;

pub struct Orchestrator {
    store: Arc<SessionStore>,
    config: ConfigStore,
    cancels: CancelRegistry,
    registry: ToolRegistry,
    workspace: Workspace,
    runner: Arc<dyn CommandRunner>,
    client: LlmClient,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Orchestrator over `~/.openspace`, working in the current directory.
    pub fn new() -> Self {
        Self::with_paths(DataPaths::default_home(), Workspace::current_dir())
    }

    /// Orchestrator over explicit locations (tests, portable installs).
    pub fn with_paths(paths: DataPaths, workspace: Workspace) -> Self {
        paths.ensure();
        Self {
            store: Arc::new(SessionStore::open(&paths)),
            config: ConfigStore::open(&paths),
            cancels: CancelRegistry::new(),
            registry: ToolRegistry::new(),
            workspace,
            runner: Arc::new(ShellRunner),
            client: LlmClient::new(),
        }
    }

    /// Swap the command runner (tests stub the shell through this seam).
    pub fn with_command_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Tool execution context bound to a cancellation token.
    pub(crate) fn tool_ctx(&self, cancel: tokio_util::sync::CancellationToken) -> ToolCtx {
        ToolCtx {
            store: Arc::clone(&self.store),
            workspace: self.workspace.clone(),
            runner: Arc::clone(&self.runner),
            cancel,
        }
    }

    pub(crate) fn store(&self) -> &SessionStore {
        &self.store
    }

    pub(crate) fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub(crate) fn cancels(&self) -> &CancelRegistry {
        &self.cancels
    }

    pub(crate) fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub(crate) fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub(crate) fn client(&self) -> &LlmClient {
        &self.client
    }

    // ─── Sessions ───────────────────────────────────────────────────────

    /// All sessions, most recently updated first.
    pub fn list_sessions(&self) -> Vec<Session> {
        self.store.list()
    }

    pub fn create_session(
        &self,
        title: &str,
        parent_id: Option<&str>,
    ) -> Session {
        self.store.create(title, parent_id)
    }

    pub fn get_session(&self, session_id: &str) -> Result<Session, OrchestratorError> {
        Ok(self.store.get(session_id)?)
    }

    pub fn get_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, OrchestratorError> {
        Ok(self.store.messages(session_id, limit)?)
    }

    pub fn get_children(&self, session_id: &str) -> Vec<SessionChild> {
        self.store.children(session_id)
    }

    pub fn get_todos(&self, session_id: &str) -> Result<Vec<TodoItem>, OrchestratorError> {
        Ok(self.store.todos(session_id)?)
    }

    pub fn update_session(
        &self,
        session_id: &str,
        title: &str,
    ) -> Result<Session, OrchestratorError> {
        Ok(self.store.update(session_id, title)?)
    }

    pub fn delete_session(&self, session_id: &str) -> Result<(), OrchestratorError> {
        Ok(self.store.delete(session_id)?)
    }

    /// Cancel any in-flight generation for the session.
    pub fn abort_session(&self, session_id: &str) {
        self.cancels.cancel(session_id);
    }

    // ─── Config & Providers ─────────────────────────────────────────────

    pub fn get_config(&self) -> Value {
        self.config.snapshot()
    }

    pub fn update_config(&self, config_data: &str) -> Result<Value, OrchestratorError> {
        Ok(self.config.update_from_str(config_data)?)
    }

    /// Provider catalog for the model picker.
    pub fn get_providers(&self) -> Value {
        self.config.providers_payload()
    }

    pub fn get_custom_llm_services(&self) -> Vec<CustomLLMService> {
        self.config.custom_services()
    }

    pub fn add_custom_llm_service(
        &self,
        config_data: &str,
    ) -> Result<CustomLLMService, OrchestratorError> {
        Ok(self.config.add_service(config_data)?)
    }

    pub fn update_custom_llm_service(
        &self,
        service_id: &str,
        config_data: &str,
    ) -> Result<CustomLLMService, OrchestratorError> {
        Ok(self.config.update_service(service_id, config_data)?)
    }

    pub fn delete_custom_llm_service(
        &self,
        service_id: &str,
    ) -> Result<(), OrchestratorError> {
        Ok(self.config.delete_service(service_id)?)
    }

    /// One-shot connectivity probe against a service payload.
    pub async fn test_custom_llm_service(
        &self,
        config_data: &str,
    ) -> Result<Value, OrchestratorError> {
        let service: CustomLLMService =
            serde_json::from_str(config_data).map_err(|e| {
                OrchestratorError::Config(crate::config::ConfigError::InvalidJson {
                    reason: e.to_string(),
                })
            })?;
        Ok(self.client.test_service(&service).await?)
    }

    /// Replace a session's todo list (IPC passthrough).
    pub fn update_session_todos(
        &self,
        session_id: &str,
        todos: Vec<TodoItem>,
    ) -> Result<(), OrchestratorError> {
        Ok(self.store.set_todos(session_id, todos)?)
    }

    /// `{success: true}` payload used by delete/abort IPC responses.
    pub fn success_payload() -> Value {
        json!({ "success": true })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
