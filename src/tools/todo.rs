//! manage_todo — the session task list, persisted through the store.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{require_string_arg, ToolCtx, ToolError, ToolHandler, ToolSpec};
use crate::session::{TodoItem, TodoPriority, TodoStatus};

pub struct ManageTodoTool;

#[async_trait]
impl ToolHandler for ManageTodoTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "manage_todo",
            description: "Manage session todo list.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": { "type": "string", "enum": ["add", "update", "delete", "list"] },
                    "content": { "type": "string" },
                    "id": { "type": "string" },
                    "status": { "type": "string", "enum": ["pending", "in_progress", "completed"] },
                },
                "required": ["action"],
                "additionalProperties": false,
            }),
        }
    }

    fn allowed_in_plan_mode(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &ToolCtx,
        session_id: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let action = require_string_arg(args, "action")?;
        let session = ctx.store.get(session_id).map_err(|_| ToolError::Failed {
            reason: "session not found".to_string(),
        })?;
        let mut todos = session.todos;

        match action {
            "add" => {
                let content = require_string_arg(args, "content")?;
                let todo = TodoItem {
                    id: format!("todo_{}", uuid::Uuid::new_v4()),
                    content: content.to_string(),
                    status: TodoStatus::Pending,
                    priority: TodoPriority::Medium,
                };
                let message = format!("Todo added: {} (ID: {})", content, todo.id);
                todos.push(todo);
                ctx.store.set_todos(session_id, todos)?;
                Ok(message)
            }
            "update" => {
                let id = require_string_arg(args, "id")?;
                let status = args
                    .get("status")
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(parse_status)
                    .transpose()?;

                let slot = todos
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or_else(|| ToolError::Failed {
                        reason: format!("todo {id} not found"),
                    })?;
                if let Some(status) = status {
                    slot.status = status;
                }
                ctx.store.set_todos(session_id, todos)?;
                Ok(format!("Todo updated: {id}"))
            }
            "delete" => {
                let id = require_string_arg(args, "id")?;
                let before = todos.len();
                todos.retain(|t| t.id != id);
                if todos.len() == before {
                    return Err(ToolError::Failed {
                        reason: format!("todo {id} not found"),
                    });
                }
                ctx.store.set_todos(session_id, todos)?;
                Ok(format!("Todo deleted: {id}"))
            }
            "list" => {
                if todos.is_empty() {
                    return Ok("No todos in this session.".to_string());
                }
                let lines: Vec<String> = todos
                    .iter()
                    .map(|t| {
                        let icon = match t.status {
                            TodoStatus::Completed => "[x]",
                            TodoStatus::InProgress => "[/]",
                            TodoStatus::Pending => "[ ]",
                        };
                        format!("{} {} (ID: {})", icon, t.content, t.id)
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            _ => Err(ToolError::Failed {
                reason: "unknown action. Use add, update, delete, or list.".to_string(),
            }),
        }
    }
}

fn parse_status(s: &str) -> Result<TodoStatus, ToolError> {
    match s {
        "pending" => Ok(TodoStatus::Pending),
        "in_progress" => Ok(TodoStatus::InProgress),
        "completed" => Ok(TodoStatus::Completed),
        _ => Err(ToolError::InvalidArg {
            key: "status".to_string(),
            expected: "pending|in_progress|completed".to_string(),
        }),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
