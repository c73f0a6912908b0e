//! `run_bash` — execute commands on the host, plus the subprocess helper
//! shared by every tool that shells out.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{info, warn};

use hostpilot_core::utils::home_dir;
use hostpilot_core::{ToolArguments, ToolResult};

use super::base::{require_string, Tool};

/// PATH given to every command, independent of the agent's own environment.
pub const COMMAND_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Default command timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ─────────────────────────────────────────────
// Subprocess helper
// ─────────────────────────────────────────────

/// Error text for a command that overran its timeout.
pub fn timeout_message(timeout: Duration) -> String {
    format!("Command timed out after {} seconds", timeout.as_secs())
}

/// Spawn `command` with piped output and wait up to `timeout`.
///
/// Returns `Ok(None)` on timeout; the child is killed when dropped.
pub(crate) async fn output_with_timeout(
    mut command: Command,
    timeout: Duration,
) -> anyhow::Result<Option<Output>> {
    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| anyhow::anyhow!("Failed to spawn command: {e}"))?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(Some(output)),
        Ok(Err(e)) => anyhow::bail!("Command failed: {e}"),
        Err(_) => Ok(None),
    }
}

/// `sh -c <script>` with the fixed PATH.
pub(crate) fn shell_command(script: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(script).env("PATH", COMMAND_PATH);
    command
}

// ─────────────────────────────────────────────
// RunBashTool
// ─────────────────────────────────────────────

/// Runs an arbitrary shell command in the user's home directory.
pub struct RunBashTool {
    working_dir: PathBuf,
    timeout: Duration,
}

impl RunBashTool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            working_dir: home_dir(),
            timeout,
        }
    }

    /// Override the working directory (defaults to `$HOME`).
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }
}

#[async_trait]
impl Tool for RunBashTool {
    fn name(&self) -> &str {
        "run_bash"
    }

    fn description(&self) -> &str {
        "Execute a bash command on the server. Returns stdout, stderr, and exit code. \
         Use this to run any Linux command, install packages, manage processes, etc."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, params: ToolArguments) -> anyhow::Result<ToolResult> {
        let command = require_string(&params, "command")?;
        info!(command = %command, cwd = %self.working_dir.display(), "executing shell command");

        let mut cmd = shell_command(&command);
        cmd.current_dir(&self.working_dir);

        match output_with_timeout(cmd, self.timeout).await? {
            Some(output) => Ok(ToolResult::Command {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
            }),
            None => {
                warn!(command = %command, "command timed out");
                Ok(ToolResult::error(timeout_message(self.timeout)))
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_params(pairs: &[(&str, &str)]) -> ToolArguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn tool(timeout_secs: u64) -> (tempfile::TempDir, RunBashTool) {
        let dir = tempfile::tempdir().unwrap();
        let tool = RunBashTool::new(Duration::from_secs(timeout_secs))
            .with_working_dir(dir.path().to_path_buf());
        (dir, tool)
    }

    #[tokio::test]
    async fn test_run_bash_echo() {
        let (_dir, tool) = tool(10);
        let result = tool
            .execute(make_params(&[("command", "echo hello; echo oops >&2")]))
            .await
            .unwrap();
        assert_eq!(
            result,
            ToolResult::Command {
                stdout: "hello\n".into(),
                stderr: "oops\n".into(),
                exit_code: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_data() {
        let (_dir, tool) = tool(10);
        let result = tool.execute(make_params(&[("command", "exit 42")])).await.unwrap();
        assert!(matches!(result, ToolResult::Command { exit_code: 42, .. }));
    }

    #[tokio::test]
    async fn test_fixed_path_and_cwd() {
        let (dir, tool) = tool(10);
        let result = tool
            .execute(make_params(&[("command", "echo $PATH; pwd")]))
            .await
            .unwrap();
        let ToolResult::Command { stdout, .. } = result else {
            panic!("expected command result");
        };
        let mut lines = stdout.lines();
        assert_eq!(lines.next(), Some(COMMAND_PATH));
        let cwd = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(
            std::fs::canonicalize(lines.next().unwrap()).unwrap(),
            cwd
        );
    }

    #[tokio::test]
    async fn test_default_working_dir_is_home() {
        let tool = RunBashTool::new(Duration::from_secs(5));
        assert_eq!(tool.working_dir, home_dir());
    }

    #[tokio::test]
    async fn test_run_bash_short_timeout() {
        let (_dir, tool) = tool(1);
        let started = std::time::Instant::now();
        let result = tool.execute(make_params(&[("command", "sleep 30")])).await.unwrap();
        assert_eq!(result, ToolResult::error("Command timed out after 1 seconds"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    #[ignore = "takes a full minute"]
    async fn test_run_bash_sleep_120_hits_default_timeout() {
        let (_dir, tool) = tool(DEFAULT_TIMEOUT_SECS);
        let started = std::time::Instant::now();
        let result = tool.execute(make_params(&[("command", "sleep 120")])).await.unwrap();
        assert_eq!(result, ToolResult::error("Command timed out after 60 seconds"));
        assert!(started.elapsed() < Duration::from_secs(70));
    }

    #[tokio::test]
    async fn test_missing_command_is_error() {
        let (_dir, tool) = tool(1);
        assert!(tool.execute(ToolArguments::new()).await.is_err());
    }
}
