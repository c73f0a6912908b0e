//! Tool Registry — the fixed, ordered tool catalogue and its dispatcher.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use hostpilot_core::{ToolArguments, ToolResult, ToolSpec};

use super::base::Tool;
use super::filesystem::{ListDirectoryTool, ReadFileTool, WriteFileTool};
use super::search::SearchFilesTool;
use super::shell::RunBashTool;

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools in registration order and dispatches calls by name.
///
/// Owns `Arc<dyn Tool>` so a registry can be shared across sessions.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry from `tools`. Later duplicates replace earlier ones.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut registry = Self {
            tools: Vec::with_capacity(tools.len()),
            index: HashMap::new(),
        };
        for tool in tools {
            let name = tool.name().to_string();
            match registry.index.get(&name) {
                Some(&i) => registry.tools[i] = tool,
                None => {
                    registry.index.insert(name, registry.tools.len());
                    registry.tools.push(tool);
                }
            }
        }
        registry
    }

    /// The five host tools: `run_bash`, `read_file`, `write_file`,
    /// `list_directory`, `search_files`.
    pub fn builtin(exec_timeout: Duration) -> Self {
        Self::new(vec![
            Arc::new(RunBashTool::new(exec_timeout)),
            Arc::new(ReadFileTool),
            Arc::new(WriteFileTool),
            Arc::new(ListDirectoryTool::new(exec_timeout)),
            Arc::new(SearchFilesTool::new(exec_timeout)),
        ])
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Catalogue entries in registration order.
    pub fn list(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.to_spec()).collect()
    }

    /// Execute a tool by name. Never fails: every error becomes
    /// [`ToolResult::Error`] for the model to read.
    pub async fn execute(&self, name: &str, params: ToolArguments) -> ToolResult {
        let tool = match self.get(name) {
            Some(t) => t,
            None => {
                warn!(tool = name, "tool not found");
                return ToolResult::error(format!("Unknown tool: {name}"));
            }
        };

        debug!(tool = name, "executing tool");
        match tool.execute(params).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                ToolResult::error(e.to_string())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin(Duration::from_secs(super::shell::DEFAULT_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    /// Minimal test tool.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to echo" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, params: ToolArguments) -> anyhow::Result<ToolResult> {
            let text = params.get("text").and_then(|v| v.as_str()).unwrap_or("(empty)");
            Ok(ToolResult::Search {
                results: format!("Echo: {text}"),
            })
        }
    }

    /// Tool that always fails.
    struct FailTool;

    #[async_trait]
    impl Tool for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}, "required": []})
        }
        async fn execute(&self, _params: ToolArguments) -> anyhow::Result<ToolResult> {
            anyhow::bail!("intentional failure")
        }
    }

    #[test]
    fn test_builtin_catalogue_order() {
        let reg = ToolRegistry::default();
        let names: Vec<String> = reg.list().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["run_bash", "read_file", "write_file", "list_directory", "search_files"]
        );
    }

    #[test]
    fn test_search_type_is_closed_enum() {
        let reg = ToolRegistry::default();
        let spec = reg.list().into_iter().find(|s| s.name == "search_files").unwrap();
        assert_eq!(
            spec.parameters["properties"]["search_type"]["enum"],
            json!(["filename", "content"])
        );
    }

    #[test]
    fn test_duplicate_replaces_in_place() {
        let reg = ToolRegistry::new(vec![Arc::new(EchoTool), Arc::new(FailTool), Arc::new(EchoTool)]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.list()[0].name, "echo");
        assert!(reg.has("fail"));
    }

    #[tokio::test]
    async fn test_execute_success() {
        let reg = ToolRegistry::new(vec![Arc::new(EchoTool)]);
        let params = ToolArguments::from([("text".to_string(), json!("hello"))]);
        let result = reg.execute("echo", params).await;
        assert_eq!(result, ToolResult::Search { results: "Echo: hello".into() });
    }

    #[tokio::test]
    async fn test_execute_not_found() {
        let reg = ToolRegistry::new(vec![]);
        assert!(reg.is_empty());
        let result = reg.execute("missing", ToolArguments::new()).await;
        assert_eq!(result, ToolResult::error("Unknown tool: missing"));
    }

    #[tokio::test]
    async fn test_execute_error_caught() {
        let reg = ToolRegistry::new(vec![Arc::new(FailTool)]);
        let result = reg.execute("fail", ToolArguments::new()).await;
        assert_eq!(result, ToolResult::error("intentional failure"));
    }

    #[tokio::test]
    async fn test_missing_argument_becomes_error_result() {
        let reg = ToolRegistry::default();
        let result = reg.execute("read_file", ToolArguments::new()).await;
        assert_eq!(result, ToolResult::error("Missing required parameter: path"));
    }
}
