//! File tools: search_files, read_file, list_files, save_file.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{require_string_arg, ToolCtx, ToolError, ToolHandler, ToolSpec};

/// Search results are capped so a broad query cannot flood the context.
const SEARCH_RESULT_LIMIT: usize = 10;

/// Bytes of file content forwarded to the model before truncation.
const READ_FILE_LIMIT: usize = 5000;

/// Truncate to at most `limit` bytes without splitting a UTF-8 character.
fn truncate_utf8(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let mut end = limit;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ─── search_files ───────────────────────────────────────────────────────────

pub struct SearchFilesTool;

#[async_trait]
impl ToolHandler for SearchFilesTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "search_files",
            description: "Search for files by name.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                },
                "required": ["query"],
                "additionalProperties": false,
            }),
        }
    }

    fn allowed_in_plan_mode(&self) -> bool {
        true
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(10))
    }

    async fn execute(
        &self,
        ctx: &ToolCtx,
        _session_id: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let query = require_string_arg(args, "query")?;
        let files =
            ctx.workspace
                .find_files_by_name(query, SEARCH_RESULT_LIMIT, &ctx.cancel)?;
        Ok(files.join("\n"))
    }
}

// ─── read_file ──────────────────────────────────────────────────────────────

pub struct ReadFileTool;

#[async_trait]
impl ToolHandler for ReadFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "read_file",
            description: "Read the content of a file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                },
                "required": ["path"],
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
        _session_id: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let path = require_string_arg(args, "path")?;
        let content = ctx.workspace.read_file(path)?;
        if content.len() > READ_FILE_LIMIT {
            Ok(format!(
                "{}... (truncated)",
                truncate_utf8(&content, READ_FILE_LIMIT)
            ))
        } else {
            Ok(content)
        }
    }
}

// ─── list_files ─────────────────────────────────────────────────────────────

pub struct ListFilesTool;

#[async_trait]
impl ToolHandler for ListFilesTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "list_files",
            description: "List files in a directory.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                },
                "required": ["path"],
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
        _session_id: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let path = require_string_arg(args, "path")?;
        let files = ctx.workspace.list_dir(path)?;
        let lines: Vec<String> = files
            .iter()
            .map(|f| format!("{} ({})", f.name, f.kind))
            .collect();
        Ok(lines.join("\n"))
    }
}

// ─── save_file ──────────────────────────────────────────────────────────────

pub struct SaveFileTool;

#[async_trait]
impl ToolHandler for SaveFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "save_file",
            description: "Save content to a file.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "content": { "type": "string" },
                },
                "required": ["path", "content"],
                "additionalProperties": false,
            }),
        }
    }

    fn allowed_in_plan_mode(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        ctx: &ToolCtx,
        _session_id: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let path = require_string_arg(args, "path")?;
        let content = require_string_arg(args, "content")?;
        ctx.workspace.save_file(path, content)?;
        Ok("File saved successfully".to_string())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
