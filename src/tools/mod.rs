//! Tool catalog and dispatch.
//!
//! A fixed registry of handlers, each declaring a JSON-schema parameter
//! spec, a plan-mode permission bit, and an optional execution deadline.
//! The dispatcher resolves a `ToolCall` to its handler, enforces plan
//! mode, imposes the deadline, and always produces a `ToolResult` — tool
//! failures are contained (the model sees them in the next frame), they
//! never fail the turn.

pub mod command;
pub mod files;
pub mod git;
pub mod todo;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::session::SessionStore;
use crate::workspace::{CommandRunner, Workspace, WorkspaceError};

// ─── Shared Types ───────────────────────────────────────────────────────────

/// A structured tool invocation parsed from a model response.
#[derive(Debug, Clone, Default)]
pub struct ToolCall {
    /// Provider-assigned call id; empty until the dispatcher assigns one.
    pub id: String,
    pub name: String,
    pub args: Map<String, Value>,
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

/// Identity and parameter schema of a tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON-schema object: `type`/`properties`/`required`, closed world.
    pub parameters: Value,
}

/// Errors raised inside tool handlers. Always contained in a `ToolResult`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing required arg: {key}")]
    MissingArg { key: String },

    #[error("arg {key} must be {expected}")]
    InvalidArg { key: String, expected: String },

    #[error("{reason}")]
    Failed { reason: String },

    #[error("tool timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

impl From<crate::session::StoreError> for ToolError {
    fn from(e: crate::session::StoreError) -> Self {
        ToolError::Failed {
            reason: e.to_string(),
        }
    }
}

// ─── Execution Context ──────────────────────────────────────────────────────

/// Everything a handler may need: the session store (todos), workspace
/// file access, the command runner seam, and the ambient cancellation
/// token of the enclosing generation.
pub struct ToolCtx {
    pub store: Arc<SessionStore>,
    pub workspace: Workspace,
    pub runner: Arc<dyn CommandRunner>,
    pub cancel: CancellationToken,
}

// ─── Handler Trait & Registry ───────────────────────────────────────────────

/// One entry of the tool catalog.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// True iff the tool is side-effect free and may run in plan mode.
    fn allowed_in_plan_mode(&self) -> bool;

    /// Execution deadline beyond the ambient context, if any.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn execute(
        &self,
        ctx: &ToolCtx,
        session_id: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError>;
}

/// The fixed tool catalog.
pub struct ToolRegistry {
    handlers: HashMap<&'static str, Box<dyn ToolHandler>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.register(Box::new(files::SearchFilesTool));
        registry.register(Box::new(files::ReadFileTool));
        registry.register(Box::new(files::ListFilesTool));
        registry.register(Box::new(command::RunCommandTool));
        registry.register(Box::new(files::SaveFileTool));
        registry.register(Box::new(git::GitStatusTool));
        registry.register(Box::new(git::GitDiffTool));
        registry.register(Box::new(todo::ManageTodoTool));
        registry
    }

    fn register(&mut self, handler: Box<dyn ToolHandler>) {
        self.handlers.insert(handler.spec().name, handler);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ToolHandler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }

    /// OpenAI-style tool definitions, sorted by name for stable requests.
    pub fn openai_tools(&self) -> Vec<Value> {
        let mut names: Vec<&&'static str> = self.handlers.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| {
                let spec = self.handlers[name].spec();
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": spec.name,
                        "description": spec.description,
                        "parameters": spec.parameters,
                    },
                })
            })
            .collect()
    }

    /// Dispatch one tool call: resolve → plan-mode gate → deadline → run.
    pub async fn execute_tool_call(
        &self,
        ctx: &ToolCtx,
        session_id: &str,
        mut call: ToolCall,
        plan_mode: bool,
    ) -> ToolResult {
        if call.id.is_empty() {
            call.id = format!("call_{}", uuid::Uuid::new_v4());
        }

        let Some(handler) = self.get(&call.name) else {
            return ToolResult {
                tool_call_id: call.id,
                content: format!("Unknown tool: {}", call.name),
                name: call.name,
                is_error: true,
            };
        };

        if plan_mode && !handler.allowed_in_plan_mode() {
            return ToolResult {
                tool_call_id: call.id,
                content: format!("Tool not allowed in PLAN mode: {}", call.name),
                name: call.name,
                is_error: true,
            };
        }

        tracing::info!(tool = %call.name, session_id = %session_id, "dispatching tool call");

        let outcome = match handler.timeout() {
            Some(deadline) => {
                match tokio::time::timeout(deadline, handler.execute(ctx, session_id, &call.args))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ToolError::Timeout {
                        secs: deadline.as_secs(),
                    }),
                }
            }
            None => handler.execute(ctx, session_id, &call.args).await,
        };

        match outcome {
            Ok(content) => ToolResult {
                tool_call_id: call.id,
                name: call.name,
                content,
                is_error: false,
            },
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                ToolResult {
                    tool_call_id: call.id,
                    name: call.name,
                    content: format!("Error: {e}"),
                    is_error: true,
                }
            }
        }
    }
}

// ─── Arg Helpers ────────────────────────────────────────────────────────────

/// A required string argument.
pub(crate) fn require_string_arg<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::MissingArg {
            key: key.to_string(),
        }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ToolError::InvalidArg {
            key: key.to_string(),
            expected: "a string".to_string(),
        }),
    }
}

/// An optional boolean argument; string `"true"`/`"false"` also accepted
/// (XML-dialect args arrive as strings).
pub(crate) fn optional_bool_arg(
    args: &Map<String, Value>,
    key: &str,
    default: bool,
) -> Result<bool, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ToolError::InvalidArg {
                key: key.to_string(),
                expected: "true|false".to_string(),
            }),
        },
        Some(_) => Err(ToolError::InvalidArg {
            key: key.to_string(),
            expected: "true|false".to_string(),
        }),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::DataPaths;
    use crate::workspace::ShellRunner;

    pub(crate) fn test_ctx() -> (tempfile::TempDir, ToolCtx) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DataPaths::at(tmp.path().join("data-root"));
        paths.ensure();
        let ctx = ToolCtx {
            store: Arc::new(SessionStore::open(&paths)),
            workspace: Workspace::new(tmp.path()),
            runner: Arc::new(ShellRunner),
            cancel: CancellationToken::new(),
        };
        (tmp, ctx)
    }

    #[test]
    fn test_registry_has_full_catalog() {
        let registry = ToolRegistry::new();
        for name in [
            "search_files",
            "read_file",
            "list_files",
            "run_command",
            "save_file",
            "git_status",
            "git_diff",
            "manage_todo",
        ] {
            assert!(registry.get(name).is_some(), "missing tool: {name}");
        }
    }

    #[test]
    fn test_openai_tools_sorted_and_shaped() {
        let registry = ToolRegistry::new();
        let tools = registry.openai_tools();
        assert_eq!(tools.len(), 8);

        let names: Vec<&str> = tools
            .iter()
            .map(|t| t["function"]["name"].as_str().unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        for tool in &tools {
            assert_eq!(tool["type"], "function");
            assert_eq!(tool["function"]["parameters"]["type"], "object");
            assert_eq!(
                tool["function"]["parameters"]["additionalProperties"],
                false
            );
        }
    }

    #[test]
    fn test_plan_mode_bits() {
        let registry = ToolRegistry::new();
        for (name, allowed) in [
            ("read_file", true),
            ("search_files", true),
            ("list_files", true),
            ("git_status", true),
            ("git_diff", true),
            ("manage_todo", true),
            ("run_command", false),
            ("save_file", false),
        ] {
            assert_eq!(
                registry.get(name).unwrap().allowed_in_plan_mode(),
                allowed,
                "plan-mode bit wrong for {name}"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_contained() {
        let (_tmp, ctx) = test_ctx();
        let registry = ToolRegistry::new();
        let result = registry
            .execute_tool_call(
                &ctx,
                "s1",
                ToolCall {
                    name: "nope".to_string(),
                    ..Default::default()
                },
                false,
            )
            .await;
        assert!(result.is_error);
        assert_eq!(result.content, "Unknown tool: nope");
        assert!(result.tool_call_id.starts_with("call_"));
    }

    #[tokio::test]
    async fn test_plan_mode_denies_save_file() {
        let (_tmp, ctx) = test_ctx();
        let registry = ToolRegistry::new();
        let mut args = Map::new();
        args.insert("path".to_string(), Value::String("x.txt".to_string()));
        args.insert("content".to_string(), Value::String("data".to_string()));

        let result = registry
            .execute_tool_call(
                &ctx,
                "s1",
                ToolCall {
                    id: "c1".to_string(),
                    name: "save_file".to_string(),
                    args,
                },
                true,
            )
            .await;
        assert!(result.is_error);
        assert_eq!(result.content, "Tool not allowed in PLAN mode: save_file");
        assert!(ctx.workspace.read_file("x.txt").is_err());
    }

    #[test]
    fn test_optional_bool_arg_accepts_strings() {
        let mut args = Map::new();
        args.insert("staged".to_string(), Value::String("true".to_string()));
        assert!(optional_bool_arg(&args, "staged", false).unwrap());

        args.insert("staged".to_string(), Value::Bool(false));
        assert!(!optional_bool_arg(&args, "staged", true).unwrap());

        args.insert("staged".to_string(), Value::String("maybe".to_string()));
        assert!(optional_bool_arg(&args, "staged", false).is_err());

        assert!(optional_bool_arg(&Map::new(), "staged", true).unwrap());
    }
}
