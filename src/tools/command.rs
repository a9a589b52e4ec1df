//! run_command — arbitrary shell execution via the command-runner seam.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{require_string_arg, ToolCtx, ToolError, ToolHandler, ToolSpec};

pub struct RunCommandTool;

#[async_trait]
impl ToolHandler for RunCommandTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "run_command",
            description: "Execute a shell command.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string" },
                },
                "required": ["command"],
                "additionalProperties": false,
            }),
        }
    }

    fn allowed_in_plan_mode(&self) -> bool {
        false
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(60))
    }

    async fn execute(
        &self,
        ctx: &ToolCtx,
        _session_id: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let command = require_string_arg(args, "command")?;
        let result = ctx
            .runner
            .run(command, ctx.workspace.root(), &ctx.cancel)
            .await?;

        if result.exit_code != 0 {
            return Err(ToolError::Failed {
                reason: format!(
                    "command exited with status {}\nOutput: {}",
                    result.exit_code, result.output
                ),
            });
        }
        Ok(result.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::test_ctx;

    fn command_args(cmd: &str) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("command".to_string(), Value::String(cmd.to_string()));
        args
    }

    #[tokio::test]
    async fn test_run_command_success() {
        let (_tmp, ctx) = test_ctx();
        let out = RunCommandTool
            .execute(&ctx, "s1", &command_args("echo hi"))
            .await
            .unwrap();
        assert_eq!(out.trim(), "hi");
    }

    #[tokio::test]
    async fn test_run_command_failure_carries_output() {
        let (_tmp, ctx) = test_ctx();
        let err = RunCommandTool
            .execute(&ctx, "s1", &command_args("echo boom; exit 2"))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("status 2"));
        assert!(msg.contains("boom"));
    }

    #[tokio::test]
    async fn test_run_command_missing_arg() {
        let (_tmp, ctx) = test_ctx();
        let err = RunCommandTool
            .execute(&ctx, "s1", &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingArg { .. }));
    }
}
