//! OpenAI-compatible `/chat/completions` adapter.
//!
//! Talks to Ollama by default (`http://localhost:11434/v1`) but works against
//! any endpoint speaking the chat completions protocol with function tools.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use hostpilot_core::config::ProviderConfig;
use hostpilot_core::{
    ModelReply, ProviderError, ProviderKind, ToolArguments, ToolInvocation, ToolSpec, Turn,
};

use crate::http::send_json;
use crate::traits::{ChatRequest, LlmRequestConfig, ProviderAdapter, TASK_COMPLETED};

/// Round-trips allowed per `chat()` call before giving up.
pub const MAX_TOOL_ITERATIONS: usize = 10;

const DEFAULT_API_BASE: &str = "http://localhost:11434/v1";
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const DISPLAY_NAME: &str = "Ollama";

// ─────────────────────────────────────────────
// Wire types (OpenAI chat completions format)
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "role")]
enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: String },

    #[serde(rename = "assistant")]
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },

    #[serde(rename = "tool")]
    Tool {
        content: String,
        tool_call_id: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// `arguments` is a JSON-encoded string on the wire. Some servers (Ollama
/// among them) send an object instead, so incoming values are kept raw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: FunctionDefinition<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionDefinition<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

// ─────────────────────────────────────────────
// OpenAiCompatAdapter
// ─────────────────────────────────────────────

/// Adapter for OpenAI-compatible endpoints with function calling.
pub struct OpenAiCompatAdapter {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    config: LlmRequestConfig,
    health_check: bool,
}

impl std::fmt::Debug for OpenAiCompatAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatAdapter")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("health_check", &self.health_check)
            .finish()
    }
}

impl OpenAiCompatAdapter {
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
            health_check: true,
        }
    }

    /// Enable or disable the Ollama `/api/tags` probe run before each turn.
    pub fn with_health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    /// `http://host:11434/v1` → `http://host:11434/api/tags`.
    fn tags_url(&self) -> String {
        let root = self.api_base.strip_suffix("/v1").unwrap_or(&self.api_base);
        format!("{}/api/tags", root)
    }
}

fn to_wire_messages(system_prompt: &str, turns: &[Turn]) -> Result<Vec<Message>, ProviderError> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    if !system_prompt.is_empty() {
        messages.push(Message::System {
            content: system_prompt.to_string(),
        });
    }

    for turn in turns {
        let message = match turn {
            Turn::User { text } => Message::User {
                content: text.clone(),
            },
            Turn::Assistant {
                text,
                tool_invocations,
            } => {
                let tool_calls = if tool_invocations.is_empty() {
                    None
                } else {
                    Some(
                        tool_invocations
                            .iter()
                            .map(encode_tool_call)
                            .collect::<Result<Vec<_>, _>>()?,
                    )
                };
                Message::Assistant {
                    content: text.clone(),
                    tool_calls,
                }
            }
            Turn::ToolResult {
                invocation_id,
                result,
            } => Message::Tool {
                content: result.to_json_string(),
                tool_call_id: invocation_id.clone(),
            },
        };
        messages.push(message);
    }

    Ok(messages)
}

fn encode_tool_call(inv: &ToolInvocation) -> Result<ToolCall, ProviderError> {
    let arguments =
        serde_json::to_string(&inv.arguments).map_err(|e| ProviderError::protocol(DISPLAY_NAME, e))?;
    Ok(ToolCall {
        id: inv.id.clone(),
        call_type: function_type(),
        function: FunctionCall {
            name: inv.tool_name.clone(),
            arguments: Value::String(arguments),
        },
    })
}

fn decode_arguments(name: &str, raw: Value) -> Result<ToolArguments, ProviderError> {
    let value = match raw {
        Value::String(s) if s.trim().is_empty() => return Ok(ToolArguments::new()),
        Value::String(s) => serde_json::from_str::<Value>(&s).map_err(|e| {
            ProviderError::protocol(
                DISPLAY_NAME,
                format!("unparseable arguments for '{name}': {e}"),
            )
        })?,
        other => other,
    };

    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Null => Ok(ToolArguments::new()),
        other => Err(ProviderError::protocol(
            DISPLAY_NAME,
            format!("arguments for '{name}' are not an object: {other}"),
        )),
    }
}

fn to_wire_tools(tools: &[ToolSpec]) -> Vec<ToolDefinition<'_>> {
    tools
        .iter()
        .map(|t| ToolDefinition {
            tool_type: "function",
            function: FunctionDefinition {
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            },
        })
        .collect()
}

fn into_reply(response: ChatCompletionResponse) -> Result<ModelReply, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::protocol(DISPLAY_NAME, "No choices in response"))?;

    debug!(
        provider = DISPLAY_NAME,
        finish_reason = choice.finish_reason.as_deref().unwrap_or("?"),
        "LLM response received"
    );

    let tool_calls = choice.message.tool_calls.unwrap_or_default();
    if tool_calls.is_empty() {
        let text = choice.message.content.unwrap_or_default();
        return Ok(ModelReply::Final(if text.is_empty() {
            TASK_COMPLETED.to_string()
        } else {
            text
        }));
    }

    let invocations = tool_calls
        .into_iter()
        .map(|call| {
            let arguments = decode_arguments(&call.function.name, call.function.arguments)?;
            Ok(ToolInvocation::new(call.id, call.function.name, arguments))
        })
        .collect::<Result<Vec<_>, ProviderError>>()?;

    Ok(ModelReply::ToolCalls {
        text: choice.message.content.filter(|t| !t.is_empty()),
        invocations,
    })
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiCompatible
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    fn max_round_trips(&self) -> Option<usize> {
        Some(MAX_TOOL_ITERATIONS)
    }

    async fn preflight(&self) -> Result<(), ProviderError> {
        if !self.health_check {
            return Ok(());
        }

        let url = self.tags_url();
        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Ollama health check failed");
                ProviderError::transport(
                    DISPLAY_NAME,
                    format!("cannot reach Ollama at {}: {e}", self.api_base),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Ollama health check failed");
            return Err(ProviderError::Api {
                provider: DISPLAY_NAME.to_string(),
                status: status.as_u16(),
                body: format!("health check {url} returned {status}"),
            });
        }
        Ok(())
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<ModelReply, ProviderError> {
        let has_tools = !request.tools.is_empty();
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: to_wire_messages(request.system_prompt, request.turns)?,
            tools: has_tools.then(|| to_wire_tools(request.tools)),
            tool_choice: has_tools.then_some("auto"),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(
            provider = DISPLAY_NAME,
            model = %self.model,
            messages = body.messages.len(),
            tools = request.tools.len(),
            "Calling LLM"
        );

        let http = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body);

        let response: ChatCompletionResponse = send_json(DISPLAY_NAME, http).await?;
        into_reply(response)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
