//! Per-session transcript and actions logs.
//!
//! Two append-only, line-oriented files:
//! - **transcript**: what was said (`USER`, `AGENT`, `TOOL` entries, reset and
//!   provider-switch markers). Replayable with [`hostpilot_core::history`].
//! - **actions**: an audit trail of every side effect a tool performed.
//!
//! Write failures are reported through `tracing` and otherwise ignored.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::error;

use hostpilot_core::history::RESET_MARKER;
use hostpilot_core::utils::{expand_home, file_stamp, log_timestamp};
use hostpilot_core::{ProviderIdentity, ToolInvocation, ToolResult};

use crate::tools::{search_command, SearchType};

#[derive(Clone, Debug)]
pub struct SessionLogs {
    transcript: PathBuf,
    actions: PathBuf,
}

impl SessionLogs {
    /// `<log_dir>/transcripts/conversation_<ts>.log` and
    /// `<log_dir>/actions/actions_<ts>.log`.
    pub fn create(log_dir: &Path, identity: &ProviderIdentity) -> std::io::Result<Self> {
        let stamp = file_stamp();
        let transcripts = log_dir.join("transcripts");
        let actions = log_dir.join("actions");
        std::fs::create_dir_all(&transcripts)?;
        std::fs::create_dir_all(&actions)?;

        let logs = Self {
            transcript: transcripts.join(format!("conversation_{stamp}.log")),
            actions: actions.join(format!("actions_{stamp}.log")),
        };
        logs.write_headers(identity);
        Ok(logs)
    }

    /// Explicit transcript path with `actions_<transcript stem>.log` next to it.
    pub fn at_transcript(transcript: PathBuf, identity: &ProviderIdentity) -> std::io::Result<Self> {
        let dir = transcript
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)?;

        let stem = transcript
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(file_stamp);
        let logs = Self {
            actions: dir.join(format!("actions_{stem}.log")),
            transcript,
        };
        logs.write_headers(identity);
        Ok(logs)
    }

    pub fn transcript_path(&self) -> &Path {
        &self.transcript
    }

    pub fn actions_path(&self) -> &Path {
        &self.actions
    }

    fn write_headers(&self, identity: &ProviderIdentity) {
        let now = log_timestamp();
        let provider_line = format!("Provider: {}, Model: {}\n\n", identity.provider, identity.model);
        self.append_transcript(&format!(
            "=== AI Agent Conversation Log Started at {now} ===\n{provider_line}"
        ));
        self.append_actions(&format!(
            "=== AI Agent Actions Log Started at {now} ===\n{provider_line}"
        ));
    }

    // ── Transcript entries ──

    pub fn user(&self, text: &str) {
        self.append_transcript(&format!("[{}] USER: {text}\n", log_timestamp()));
    }

    pub fn agent(&self, text: &str) {
        self.append_transcript(&format!("[{}] AGENT: {text}\n", log_timestamp()));
    }

    pub fn reset(&self) {
        self.append_transcript(&format!("\n[{}] {RESET_MARKER}\n", log_timestamp()));
    }

    pub fn provider_switched(&self, from: &ProviderIdentity, to: &ProviderIdentity) {
        self.append_transcript(&format!(
            "[{}] === PROVIDER SWITCHED: {} -> {} (Model: {}) ===\n",
            log_timestamp(),
            from.provider,
            to.provider,
            to.model
        ));
    }

    /// Mirror one tool execution into both logs.
    pub fn tool(&self, invocation: &ToolInvocation, result: &ToolResult) {
        let ts = log_timestamp();
        self.append_transcript(&format!(
            "[{ts}] TOOL: {}\n  Input: {}\n  Result: {}\n",
            invocation.tool_name,
            transcript_input(invocation),
            transcript_result(result),
        ));
        self.append_actions(&action_entry(&ts, invocation, result));
    }

    // ── Raw appends ──

    fn append_transcript(&self, entry: &str) {
        append(&self.transcript, entry, "transcript");
    }

    fn append_actions(&self, entry: &str) {
        append(&self.actions, entry, "actions");
    }
}

fn append(path: &Path, entry: &str, kind: &str) {
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| f.write_all(entry.as_bytes()));
    if let Err(e) = result {
        error!(log = kind, path = %path.display(), error = %e, "failed to write session log");
    }
}

// ─────────────────────────────────────────────
// Entry rendering
// ─────────────────────────────────────────────

fn arg<'a>(invocation: &'a ToolInvocation, key: &str) -> &'a str {
    invocation
        .arguments
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn expanded_arg(invocation: &ToolInvocation, key: &str) -> String {
    expand_home(arg(invocation, key)).display().to_string()
}

/// File contents are summarised by length, never copied.
fn transcript_input(invocation: &ToolInvocation) -> String {
    if invocation.tool_name == "write_file" {
        return json!({
            "path": expanded_arg(invocation, "path"),
            "content_length": arg(invocation, "content").chars().count(),
        })
        .to_string();
    }
    serde_json::to_string(&invocation.arguments).unwrap_or_default()
}

fn transcript_result(result: &ToolResult) -> String {
    match result {
        ToolResult::FileRead { content, path } => {
            json!({"path": path, "content_length": content.chars().count()}).to_string()
        }
        ToolResult::Listing {
            listing, exit_code, ..
        } => json!({"exit_code": exit_code, "items": listing.lines().count()}).to_string(),
        ToolResult::Search { results } => json!({"matches": results.lines().count()}).to_string(),
        other => other.to_json_string(),
    }
}

fn action_entry(ts: &str, invocation: &ToolInvocation, result: &ToolResult) -> String {
    match (invocation.tool_name.as_str(), result) {
        (
            "run_bash",
            ToolResult::Command {
                stdout,
                stderr,
                exit_code,
            },
        ) => {
            let mut entry = format!(
                "[{ts}] COMMAND: {}\n  Exit Code: {exit_code}\n",
                arg(invocation, "command")
            );
            if !stdout.is_empty() {
                entry.push_str(&format!("  Output: {stdout}\n"));
            }
            if !stderr.is_empty() {
                entry.push_str(&format!("  Error: {stderr}\n"));
            }
            entry.push('\n');
            entry
        }
        ("run_bash", ToolResult::Error { error }) => format!(
            "[{ts}] COMMAND: {}\n  Error: {error}\n\n",
            arg(invocation, "command")
        ),
        (_, ToolResult::FileRead { content, path }) => format!(
            "[{ts}] FILE_READ: {path}\n  Content Length: {} characters\n\n",
            content.chars().count()
        ),
        (_, ToolResult::FileWrite { success, path }) => format!(
            "[{ts}] FILE_WRITE: {path}\n  Content Length: {} characters\n  Success: {success}\n\n",
            arg(invocation, "content").chars().count()
        ),
        (_, ToolResult::Listing {
            listing, exit_code, ..
        }) => format!(
            "[{ts}] DIRECTORY_LIST: {}\n  Items Found: {}\n  Exit Code: {exit_code}\n\n",
            expanded_arg(invocation, "path"),
            listing.lines().count()
        ),
        (_, ToolResult::Search { results }) => {
            let path = expanded_arg(invocation, "path");
            let pattern = arg(invocation, "pattern");
            let search_type = arg(invocation, "search_type");
            let command = search_type
                .parse::<SearchType>()
                .map(|t| search_command(&path, pattern, t))
                .unwrap_or_default();
            format!(
                "[{ts}] SEARCH: {search_type} for '{pattern}' in {path}\n  Command: {command}\n  Matches Found: {}\n\n",
                results.lines().count()
            )
        }
        (name, ToolResult::Error { error }) => {
            format!("[{ts}] TOOL_ERROR: {name}\n  Error: {error}\n\n")
        }
        (name, other) => format!("[{ts}] TOOL: {name}\n  Result: {}\n\n", other.to_json_string()),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hostpilot_core::history::parse_transcript;
    use hostpilot_core::{ProviderKind, Turn};
    use std::collections::HashMap;

    fn identity() -> ProviderIdentity {
        ProviderIdentity::new(ProviderKind::NoToolSupport, "gemini-2.0-flash-exp")
    }

    fn invocation(name: &str, args: &[(&str, &str)]) -> ToolInvocation {
        let arguments: HashMap<String, Value> = args
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        ToolInvocation::new("id-1", name, arguments)
    }

    #[test]
    fn test_default_layout_and_headers() {
        let dir = tempfile::tempdir().unwrap();
        let logs = SessionLogs::create(dir.path(), &identity()).unwrap();

        assert!(logs.transcript_path().starts_with(dir.path().join("transcripts")));
        assert!(logs.actions_path().starts_with(dir.path().join("actions")));
        let name = logs.transcript_path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("conversation_") && name.ends_with(".log"));

        let transcript = std::fs::read_to_string(logs.transcript_path()).unwrap();
        assert!(transcript.starts_with("=== AI Agent Conversation Log Started at "));
        assert!(transcript.contains("Provider: gemini, Model: gemini-2.0-flash-exp\n"));
        let actions = std::fs::read_to_string(logs.actions_path()).unwrap();
        assert!(actions.starts_with("=== AI Agent Actions Log Started at "));
    }

    #[test]
    fn test_explicit_transcript_puts_actions_beside_it() {
        let dir = tempfile::tempdir().unwrap();
        let transcript = dir.path().join("web/web_session_abc_20240101_000000.log");
        let logs = SessionLogs::at_transcript(transcript.clone(), &identity()).unwrap();
        assert_eq!(logs.transcript_path(), transcript);
        assert_eq!(
            logs.actions_path(),
            dir.path().join("web/actions_web_session_abc_20240101_000000.log")
        );
        assert!(logs.actions_path().exists());
    }

    #[test]
    fn test_transcript_replays_through_history_parser() {
        let dir = tempfile::tempdir().unwrap();
        let logs = SessionLogs::create(dir.path(), &identity()).unwrap();
        logs.user("first");
        logs.agent("ignored after reset");
        logs.reset();
        logs.user("check disk");
        logs.tool(
            &invocation("run_bash", &[("command", "df -h")]),
            &ToolResult::Command {
                stdout: "Filesystem\n/dev/sda1\n".into(),
                stderr: String::new(),
                exit_code: 0,
            },
        );
        logs.agent("Disk is fine.\nPlenty of space.");

        let text = std::fs::read_to_string(logs.transcript_path()).unwrap();
        assert_eq!(
            parse_transcript(&text),
            vec![
                Turn::user("check disk"),
                Turn::assistant("Disk is fine.\nPlenty of space."),
            ]
        );
    }

    #[test]
    fn test_file_contents_summarised_by_length() {
        let dir = tempfile::tempdir().unwrap();
        let logs = SessionLogs::create(dir.path(), &identity()).unwrap();
        logs.tool(
            &invocation("write_file", &[("path", "/tmp/x.conf"), ("content", "SECRET=hunter2")]),
            &ToolResult::FileWrite {
                success: true,
                path: "/tmp/x.conf".into(),
            },
        );
        logs.tool(
            &invocation("read_file", &[("path", "/tmp/x.conf")]),
            &ToolResult::FileRead {
                content: "SECRET=hunter2".into(),
                path: "/tmp/x.conf".into(),
            },
        );

        let transcript = std::fs::read_to_string(logs.transcript_path()).unwrap();
        assert!(!transcript.contains("hunter2"));
        assert!(transcript.contains(r#""content_length":14"#));

        let actions = std::fs::read_to_string(logs.actions_path()).unwrap();
        assert!(actions.contains("FILE_WRITE: /tmp/x.conf\n  Content Length: 14 characters\n  Success: true"));
        assert!(actions.contains("FILE_READ: /tmp/x.conf\n  Content Length: 14 characters"));
        assert!(!actions.contains("hunter2"));
    }

    #[test]
    fn test_action_entries() {
        let cmd = invocation("run_bash", &[("command", "uptime")]);
        let entry = action_entry(
            "T",
            &cmd,
            &ToolResult::Command {
                stdout: "up 1 day".into(),
                stderr: String::new(),
                exit_code: 0,
            },
        );
        assert_eq!(entry, "[T] COMMAND: uptime\n  Exit Code: 0\n  Output: up 1 day\n\n");

        let timeout = action_entry("T", &cmd, &ToolResult::error("Command timed out after 60 seconds"));
        assert_eq!(timeout, "[T] COMMAND: uptime\n  Error: Command timed out after 60 seconds\n\n");

        let search = action_entry(
            "T",
            &invocation(
                "search_files",
                &[("path", "/etc"), ("pattern", "ssh"), ("search_type", "filename")],
            ),
            &ToolResult::Search {
                results: "/etc/ssh\n/etc/ssh/sshd_config\n".into(),
            },
        );
        assert_eq!(
            search,
            "[T] SEARCH: filename for 'ssh' in /etc\n  Command: find /etc -name '*ssh*' 2>/dev/null\n  Matches Found: 2\n\n"
        );

        let listing = action_entry(
            "T",
            &invocation("list_directory", &[("path", "/srv")]),
            &ToolResult::Listing {
                listing: "total 0\n.\n..\n".into(),
                stderr: String::new(),
                exit_code: 0,
            },
        );
        assert_eq!(listing, "[T] DIRECTORY_LIST: /srv\n  Items Found: 3\n  Exit Code: 0\n\n");
    }

    #[test]
    fn test_provider_switch_marker() {
        let dir = tempfile::tempdir().unwrap();
        let logs = SessionLogs::create(dir.path(), &identity()).unwrap();
        logs.provider_switched(
            &identity(),
            &ProviderIdentity::new(ProviderKind::OpenAiCompatible, "llama3.1"),
        );
        let text = std::fs::read_to_string(logs.transcript_path()).unwrap();
        assert!(text.contains("=== PROVIDER SWITCHED: gemini -> ollama (Model: llama3.1) ==="));
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let logs = SessionLogs::create(dir.path(), &identity()).unwrap();
        std::fs::remove_dir_all(dir.path()).unwrap();
        logs.user("nobody hears this");
    }
}
