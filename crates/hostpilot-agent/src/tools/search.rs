//! `search_files` — filename search via `find`, content search via `grep -r`.
//!
//! The pattern and path are interpolated into a shell command line without
//! escaping. Quotes in either break out of the intended command.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use hostpilot_core::utils::expand_home;
use hostpilot_core::{ToolArguments, ToolResult};

use super::base::{require_string, Tool};
use super::shell::{output_with_timeout, shell_command, timeout_message};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchType {
    Filename,
    Content,
}

impl FromStr for SearchType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filename" => Ok(SearchType::Filename),
            "content" => Ok(SearchType::Content),
            other => anyhow::bail!("Invalid search_type '{other}': expected 'filename' or 'content'"),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchType::Filename => "filename",
            SearchType::Content => "content",
        })
    }
}

/// The shell command line a search runs.
pub fn search_command(path: &str, pattern: &str, search_type: SearchType) -> String {
    match search_type {
        SearchType::Filename => format!("find {path} -name '*{pattern}*' 2>/dev/null"),
        SearchType::Content => format!("grep -r '{pattern}' {path} 2>/dev/null"),
    }
}

pub struct SearchFilesTool {
    timeout: Duration,
}

impl SearchFilesTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search for files by name pattern or search for text content within files."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to search in"
                },
                "pattern": {
                    "type": "string",
                    "description": "Search pattern (filename or text content)"
                },
                "search_type": {
                    "type": "string",
                    "description": "Either 'filename' or 'content'",
                    "enum": ["filename", "content"]
                }
            },
            "required": ["path", "pattern", "search_type"]
        })
    }

    async fn execute(&self, params: ToolArguments) -> anyhow::Result<ToolResult> {
        let path = expand_home(&require_string(&params, "path")?);
        let pattern = require_string(&params, "pattern")?;
        let search_type: SearchType = require_string(&params, "search_type")?.parse()?;

        let cmd = search_command(&path.display().to_string(), &pattern, search_type);
        info!(command = %cmd, "searching");

        match output_with_timeout(shell_command(&cmd), self.timeout).await? {
            Some(output) => Ok(ToolResult::Search {
                results: String::from_utf8_lossy(&output.stdout).into_owned(),
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

    fn params(path: &str, pattern: &str, search_type: &str) -> ToolArguments {
        [("path", path), ("pattern", pattern), ("search_type", search_type)]
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn tool() -> SearchFilesTool {
        SearchFilesTool::new(Duration::from_secs(10))
    }

    #[test]
    fn test_search_command_shapes() {
        assert_eq!(
            search_command("/etc", "nginx", SearchType::Filename),
            "find /etc -name '*nginx*' 2>/dev/null"
        );
        assert_eq!(
            search_command("/var/log", "error", SearchType::Content),
            "grep -r 'error' /var/log 2>/dev/null"
        );
    }

    #[tokio::test]
    async fn test_filename_search() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.conf"), "").unwrap();
        std::fs::write(dir.path().join("other.txt"), "").unwrap();

        let result = tool()
            .execute(params(dir.path().to_str().unwrap(), "conf", "filename"))
            .await
            .unwrap();
        let ToolResult::Search { results } = result else {
            panic!("expected search result");
        };
        assert!(results.contains("app.conf"));
        assert!(!results.contains("other.txt"));
    }

    #[tokio::test]
    async fn test_content_search() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.log"), "ok\nERROR disk full\n").unwrap();
        std::fs::write(dir.path().join("b.log"), "all fine\n").unwrap();

        let result = tool()
            .execute(params(dir.path().to_str().unwrap(), "disk full", "content"))
            .await
            .unwrap();
        let ToolResult::Search { results } = result else {
            panic!("expected search result");
        };
        assert_eq!(results.lines().count(), 1);
        assert!(results.contains("a.log:ERROR disk full"));
    }

    #[tokio::test]
    async fn test_unknown_search_type_is_err() {
        let err = tool().execute(params("/tmp", "x", "regex")).await.unwrap_err();
        assert!(err.to_string().contains("Invalid search_type"));
    }

    /// Patterns reach the shell unescaped. A quote in the pattern ends the
    /// quoted argument and the rest runs as shell syntax.
    #[tokio::test]
    async fn test_pattern_is_interpolated_into_shell_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("injected");
        let pattern = format!("x' /dev/null; touch {}; echo '", marker.display());

        tool()
            .execute(params(dir.path().to_str().unwrap(), &pattern, "content"))
            .await
            .unwrap();
        assert!(marker.exists(), "shell metacharacters in pattern were executed");
    }
}
