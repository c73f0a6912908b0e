//! Filesystem tools — read, write, list directory.
//!
//! Paths are used as given after `~` expansion; there is no sandbox.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::info;

use hostpilot_core::utils::expand_home;
use hostpilot_core::{ToolArguments, ToolResult};

use super::base::{optional_string, require_string, Tool};
use super::shell::{output_with_timeout, timeout_message};

// ─────────────────────────────────────────────
// ReadFileTool
// ─────────────────────────────────────────────

/// Reads and returns the entire content of a file.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Returns the full file content as text."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Absolute path to the file"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: ToolArguments) -> anyhow::Result<ToolResult> {
        let path = expand_home(&require_string(&params, "path")?);
        info!(path = %path.display(), "reading file");

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;

        Ok(ToolResult::FileRead {
            content,
            path: path.display().to_string(),
        })
    }
}

// ─────────────────────────────────────────────
// WriteFileTool
// ─────────────────────────────────────────────

/// Creates or overwrites a file, creating parent directories as needed.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a file with content. Creates parent directories if needed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Absolute path to the file"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, params: ToolArguments) -> anyhow::Result<ToolResult> {
        let path = expand_home(&require_string(&params, "path")?);
        let content = require_string(&params, "content")?;
        info!(path = %path.display(), bytes = content.len(), "writing file");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", parent.display()))?;
        }
        tokio::fs::write(&path, content.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;

        Ok(ToolResult::FileWrite {
            success: true,
            path: path.display().to_string(),
        })
    }
}

// ─────────────────────────────────────────────
// ListDirectoryTool
// ─────────────────────────────────────────────

/// `ls -lah <path>`: long format, human sizes, dotfiles included.
pub struct ListDirectoryTool {
    timeout: Duration,
}

impl ListDirectoryTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List files and directories in a given path with details (size, permissions, modified time)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to list (defaults to current directory)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: ToolArguments) -> anyhow::Result<ToolResult> {
        let raw = optional_string(&params, "path").unwrap_or_else(|| ".".to_string());
        let path = expand_home(&raw);
        info!(path = %path.display(), "listing directory");

        let mut command = Command::new("ls");
        command.arg("-lah").arg(&path);

        match output_with_timeout(command, self.timeout).await? {
            Some(output) => Ok(ToolResult::Listing {
                listing: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
            }),
            None => Ok(ToolResult::error(timeout_message(self.timeout))),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ToolArguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn entry_names(listing: &str) -> Vec<String> {
        listing
            .lines()
            .filter(|l| !l.starts_with("total"))
            .filter_map(|l| l.split_whitespace().last())
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/notes.txt");
        let path_str = path.to_str().unwrap();
        let content = "line one\n\ttabbed ünïcode\nno trailing newline";

        let written = WriteFileTool
            .execute(params(&[("path", path_str), ("content", content)]))
            .await
            .unwrap();
        assert_eq!(
            written,
            ToolResult::FileWrite {
                success: true,
                path: path_str.to_string(),
            }
        );

        let read = ReadFileTool.execute(params(&[("path", path_str)])).await.unwrap();
        assert_eq!(
            read,
            ToolResult::FileRead {
                content: content.to_string(),
                path: path_str.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let p = path.to_str().unwrap();
        WriteFileTool.execute(params(&[("path", p), ("content", "long original")])).await.unwrap();
        WriteFileTool.execute(params(&[("path", p), ("content", "short")])).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_err() {
        let err = ReadFileTool
            .execute(params(&[("path", "/nonexistent/definitely/missing.txt")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ListDirectoryTool::new(Duration::from_secs(10));
        let result = tool
            .execute(params(&[("path", dir.path().to_str().unwrap())]))
            .await
            .unwrap();
        let ToolResult::Listing { listing, exit_code, .. } = result else {
            panic!("expected listing");
        };
        assert_eq!(exit_code, 0);
        let mut names = entry_names(&listing);
        names.sort();
        assert_eq!(names, vec![".", ".."]);
    }

    #[tokio::test]
    async fn test_list_includes_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".hidden"), "x").unwrap();
        std::fs::write(dir.path().join("visible"), "y").unwrap();

        let tool = ListDirectoryTool::new(Duration::from_secs(10));
        let result = tool
            .execute(params(&[("path", dir.path().to_str().unwrap())]))
            .await
            .unwrap();
        let ToolResult::Listing { listing, .. } = result else {
            panic!("expected listing");
        };
        let names = entry_names(&listing);
        assert!(names.contains(&".hidden".to_string()));
        assert!(names.contains(&"visible".to_string()));
    }

    #[tokio::test]
    async fn test_list_missing_directory_reports_exit_code() {
        let tool = ListDirectoryTool::new(Duration::from_secs(10));
        let result = tool
            .execute(params(&[("path", "/nonexistent/dir/xyz")]))
            .await
            .unwrap();
        let ToolResult::Listing { stderr, exit_code, .. } = result else {
            panic!("expected listing");
        };
        assert_ne!(exit_code, 0);
        assert!(!stderr.is_empty());
    }
}
