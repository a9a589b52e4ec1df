//! Shell command execution behind the `CommandRunner` trait.
//!
//! The orchestrator core only depends on the trait; the concrete shell
//! wiring (which shell, how the working directory is tracked) lives in
//! `ShellRunner`. Commands are wrapped so the final working directory is
//! echoed on a marker line, stripped from the output and reported
//! separately — the UI uses it to follow `cd`s across commands.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::errors::WorkspaceError;

/// Marker line the wrapped command prints to report its final cwd.
const CWD_MARKER: &str = "__OPENSPACE_CWD__=";

/// Result of one shell invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub output: String,
    pub cwd: String,
    pub shell: String,
    pub branch: String,
    pub exit_code: i32,
}

/// Executes a shell command with a working directory, cancellable.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, WorkspaceError>;
}

/// Default runner: `bash -lc` (falling back to `sh`), combined output.
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, WorkspaceError> {
        if command.trim().is_empty() {
            return Err(WorkspaceError::MissingCommand);
        }

        let script = wrap_posix_command(command, cwd);
        let (shell, output) = spawn_shell(&script, cwd, cancel).await?;

        let combined = [output.stdout, output.stderr].concat();
        let raw = String::from_utf8_lossy(&combined).to_string();
        let (clean, marker_cwd) = strip_cwd_marker(&raw);
        let final_cwd = if marker_cwd.is_empty() {
            cwd.to_string_lossy().to_string()
        } else {
            marker_cwd
        };

        Ok(CommandOutput {
            output: clean,
            branch: detect_git_branch(Path::new(&final_cwd)).await,
            cwd: final_cwd,
            shell,
            exit_code: output.status.code().unwrap_or(1),
        })
    }
}

/// Spawn via bash, falling back to sh when bash is absent.
async fn spawn_shell(
    script: &str,
    cwd: &Path,
    cancel: &CancellationToken,
) -> Result<(String, std::process::Output), WorkspaceError> {
    for shell in ["bash", "sh"] {
        let mut cmd = tokio::process::Command::new(shell);
        cmd.arg("-lc")
            .arg(script)
            .current_dir(cwd)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        let output = tokio::select! {
            out = child.wait_with_output() => out?,
            _ = cancel.cancelled() => return Err(WorkspaceError::Cancelled),
        };
        return Ok((shell.to_string(), output));
    }

    Err(WorkspaceError::Command {
        reason: "no shell available".to_string(),
    })
}

/// Wrap the user command so the exit code survives the cwd probe.
fn wrap_posix_command(command: &str, cwd: &Path) -> String {
    let cwd_literal = sh_single_quote(&cwd.to_string_lossy());
    [
        format!("cd {cwd_literal} 2>/dev/null || true"),
        command.to_string(),
        "__openspace_exit=$?".to_string(),
        format!("printf \"\\n{CWD_MARKER}%s\\n\" \"$(pwd)\""),
        "exit $__openspace_exit".to_string(),
    ]
    .join("\n")
}

fn sh_single_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Remove the cwd marker line from the output, returning (clean, cwd).
fn strip_cwd_marker(output: &str) -> (String, String) {
    let normalized = output.replace("\r\n", "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();

    let mut cwd = String::new();
    for i in (0..lines.len()).rev() {
        let line = lines[i].trim();
        if let Some(rest) = line.strip_prefix(CWD_MARKER) {
            cwd = rest.trim().to_string();
            lines.remove(i);
            break;
        }
    }

    (lines.join("\n").trim_end_matches('\n').to_string(), cwd)
}

/// Current git branch of a directory, empty when not a repo or detached.
async fn detect_git_branch(cwd: &Path) -> String {
    if cwd.as_os_str().is_empty() {
        return String::new();
    }
    let out = tokio::process::Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(cwd)
        .output()
        .await;

    match out {
        Ok(out) if out.status.success() => {
            let branch = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if branch == "HEAD" {
                String::new()
            } else {
                branch
            }
        }
        _ => String::new(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
