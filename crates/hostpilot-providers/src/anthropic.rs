//! Anthropic Messages API adapter (native tool use).
//!
//! - `x-api-key` + `anthropic-version` headers
//! - system prompt as a top-level field
//! - tool calls arrive as `tool_use` content blocks; results go back as
//!   `tool_result` blocks inside a single user message

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use hostpilot_core::config::ProviderConfig;
use hostpilot_core::{ModelReply, ProviderError, ProviderKind, ToolInvocation, ToolSpec, Turn};

use crate::http::send_json;
use crate::traits::{ChatRequest, LlmRequestConfig, ProviderAdapter, TASK_COMPLETED};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const DISPLAY_NAME: &str = "Anthropic";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
    /// Block types we don't act on (e.g. thinking).
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

// ─────────────────────────────────────────────
// AnthropicAdapter
// ─────────────────────────────────────────────

/// Native tool-calling adapter for the Anthropic Messages API.
pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    config: LlmRequestConfig,
}

impl std::fmt::Debug for AnthropicAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicAdapter")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicAdapter {
    pub fn new(credential: &ProviderConfig, model: &str, config: LlmRequestConfig) -> Self {
        let api_base = credential
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: credential.api_key.clone(),
            model: model.to_string(),
            config,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_base)
    }
}

/// Convert canonical turns to Messages API messages.
///
/// Consecutive tool results are grouped into one user message, which is how
/// the API expects the answers to a multi-tool assistant turn.
fn to_wire_messages(turns: &[Turn]) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(turns.len());
    let mut results: Vec<ContentBlock> = Vec::new();

    for turn in turns {
        if !matches!(turn, Turn::ToolResult { .. }) && !results.is_empty() {
            messages.push(WireMessage {
                role: "user",
                content: WireContent::Blocks(std::mem::take(&mut results)),
            });
        }

        match turn {
            Turn::User { text } => messages.push(WireMessage {
                role: "user",
                content: WireContent::Text(text.clone()),
            }),
            Turn::Assistant {
                text,
                tool_invocations,
            } if tool_invocations.is_empty() => messages.push(WireMessage {
                role: "assistant",
                content: WireContent::Text(text.clone().unwrap_or_default()),
            }),
            Turn::Assistant {
                text,
                tool_invocations,
            } => {
                let mut blocks = Vec::with_capacity(tool_invocations.len() + 1);
                if let Some(text) = text.as_ref().filter(|t| !t.is_empty()) {
                    blocks.push(ContentBlock::Text { text: text.clone() });
                }
                for inv in tool_invocations {
                    blocks.push(ContentBlock::ToolUse {
                        id: inv.id.clone(),
                        name: inv.tool_name.clone(),
                        input: Value::Object(inv.arguments.clone().into_iter().collect()),
                    });
                }
                messages.push(WireMessage {
                    role: "assistant",
                    content: WireContent::Blocks(blocks),
                });
            }
            Turn::ToolResult {
                invocation_id,
                result,
            } => results.push(ContentBlock::ToolResult {
                tool_use_id: invocation_id.clone(),
                content: result.to_json_string(),
            }),
        }
    }

    if !results.is_empty() {
        messages.push(WireMessage {
            role: "user",
            content: WireContent::Blocks(results),
        });
    }

    messages
}

fn to_wire_tools(tools: &[ToolSpec]) -> Vec<WireTool<'_>> {
    tools
        .iter()
        .map(|t| WireTool {
            name: &t.name,
            description: &t.description,
            input_schema: &t.parameters,
        })
        .collect()
}

/// Interpret the stop reason and content blocks of a response.
fn into_reply(response: MessagesResponse) -> Result<ModelReply, ProviderError> {
    let mut text = String::new();
    let mut invocations = Vec::new();

    for block in response.content {
        match block {
            ContentBlock::Text { text: t } => text.push_str(&t),
            ContentBlock::ToolUse { id, name, input } => {
                let arguments = match input {
                    Value::Object(map) => map.into_iter().collect(),
                    Value::Null => Default::default(),
                    other => {
                        return Err(ProviderError::protocol(
                            DISPLAY_NAME,
                            format!("tool_use input for '{name}' is not an object: {other}"),
                        ))
                    }
                };
                invocations.push(ToolInvocation::new(id, name, arguments));
            }
            ContentBlock::ToolResult { .. } | ContentBlock::Other => {}
        }
    }

    if response.stop_reason.as_deref() == Some("tool_use") {
        if invocations.is_empty() {
            return Err(ProviderError::protocol(
                DISPLAY_NAME,
                "stop_reason tool_use without tool_use blocks",
            ));
        }
        let text = if text.is_empty() { None } else { Some(text) };
        return Ok(ModelReply::ToolCalls { text, invocations });
    }

    if text.is_empty() {
        Ok(ModelReply::Final(TASK_COMPLETED.to_string()))
    } else {
        Ok(ModelReply::Final(text))
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Native
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<ModelReply, ProviderError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.config.max_tokens,
            system: request.system_prompt,
            messages: to_wire_messages(request.turns),
            tools: to_wire_tools(request.tools),
        };

        debug!(
            provider = DISPLAY_NAME,
            model = %self.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "Calling LLM"
        );

        let http = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response: MessagesResponse = send_json(DISPLAY_NAME, http).await?;
        debug!(
            provider = DISPLAY_NAME,
            stop_reason = response.stop_reason.as_deref().unwrap_or("?"),
            blocks = response.content.len(),
            "LLM response received"
        );
        into_reply(response)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
