//! Git tools: git_status and git_diff, routed through the command runner.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{optional_bool_arg, ToolCtx, ToolError, ToolHandler, ToolSpec};

/// Run a git command and return its trimmed output.
async fn run_git(ctx: &ToolCtx, command: &str) -> Result<String, ToolError> {
    let result = ctx
        .runner
        .run(command, ctx.workspace.root(), &ctx.cancel)
        .await?;
    if result.exit_code != 0 {
        return Err(ToolError::Failed {
            reason: format!("{} failed: {}", command, result.output.trim()),
        });
    }
    Ok(result.output.trim().to_string())
}

// ─── git_status ─────────────────────────────────────────────────────────────

pub struct GitStatusTool;

#[async_trait]
impl ToolHandler for GitStatusTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "git_status",
            description: "Check git status.",
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false,
            }),
        }
    }

    fn allowed_in_plan_mode(&self) -> bool {
        true
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(15))
    }

    async fn execute(
        &self,
        ctx: &ToolCtx,
        _session_id: &str,
        _args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let status = run_git(ctx, "git status --short").await?;
        if status.is_empty() {
            Ok("Clean working tree".to_string())
        } else {
            Ok(status)
        }
    }
}

// ─── git_diff ───────────────────────────────────────────────────────────────

pub struct GitDiffTool;

#[async_trait]
impl ToolHandler for GitDiffTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "git_diff",
            description: "Check git diff.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "staged": { "type": "boolean" },
                },
                "additionalProperties": false,
            }),
        }
    }

    fn allowed_in_plan_mode(&self) -> bool {
        true
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }

    async fn execute(
        &self,
        ctx: &ToolCtx,
        _session_id: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let staged = optional_bool_arg(args, "staged", false)?;
        let command = if staged { "git diff --cached" } else { "git diff" };
        let diff = run_git(ctx, command).await?;
        if diff.is_empty() {
            Ok("No changes".to_string())
        } else {
            Ok(diff)
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
