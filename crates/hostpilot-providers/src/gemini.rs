//! Gemini `generateContent` adapter, used without tools.
//!
//! The conversation is flattened into one prompt:
//!
//! ```text
//! {system}
//!
//! User: ...
//! Assistant: ...
//! Assistant:
//! ```
//!
//! Whatever text comes back is the final answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hostpilot_core::config::ProviderConfig;
use hostpilot_core::{ModelReply, ProviderError, ProviderKind, Turn};

use crate::http::send_json;
use crate::traits::{ChatRequest, LlmRequestConfig, ProviderAdapter};

/// Returned when Gemini answers with no text.
pub const EMPTY_REPLY: &str = "I apologize, but I couldn't generate a response.";

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DISPLAY_NAME: &str = "Gemini";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

// ─────────────────────────────────────────────
// GeminiAdapter
// ─────────────────────────────────────────────

pub struct GeminiAdapter {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    config: LlmRequestConfig,
}

impl std::fmt::Debug for GeminiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAdapter")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiAdapter {
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

    fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model)
    }
}

/// Flatten user and assistant text into a single prompt.
///
/// Tool turns and text-less assistant turns are skipped.
fn flatten(system_prompt: &str, turns: &[Turn]) -> String {
    let mut prompt = format!("{system_prompt}\n\n");
    for turn in turns {
        match turn {
            Turn::User { text } => {
                prompt.push_str("User: ");
                prompt.push_str(text);
                prompt.push('\n');
            }
            Turn::Assistant {
                text: Some(text), ..
            } if !text.is_empty() => {
                prompt.push_str("Assistant: ");
                prompt.push_str(text);
                prompt.push('\n');
            }
            _ => {}
        }
    }
    prompt.push_str("Assistant: ");
    prompt
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::NoToolSupport
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    fn max_round_trips(&self) -> Option<usize> {
        Some(1)
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<ModelReply, ProviderError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: flatten(request.system_prompt, request.turns),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        };

        debug!(provider = DISPLAY_NAME, model = %self.model, turns = request.turns.len(), "Calling LLM");

        let http = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let response: GenerateResponse = send_json(DISPLAY_NAME, http).await?;
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::protocol(DISPLAY_NAME, "No candidates in response"))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            Ok(ModelReply::Final(EMPTY_REPLY.to_string()))
        } else {
            Ok(ModelReply::Final(text))
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hostpilot_core::{ToolInvocation, ToolResult};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(base: &str) -> GeminiAdapter {
        let cred = ProviderConfig {
            api_key: "gm-test".into(),
            api_base: Some(base.to_string()),
        };
        GeminiAdapter::new(&cred, "gemini-2.0-flash-exp", LlmRequestConfig::default())
    }

    #[test]
    fn test_flatten_skips_tool_turns() {
        let turns = vec![
            Turn::user("hi"),
            Turn::assistant("hello"),
            Turn::assistant_tool_calls(None, vec![ToolInvocation::new("x", "run_bash", Default::default())]),
            Turn::tool_result("x", ToolResult::error("n/a")),
            Turn::user("how are you?"),
        ];
        assert_eq!(
            flatten("You are a sysadmin.", &turns),
            "You are a sysadmin.\n\nUser: hi\nAssistant: hello\nUser: how are you?\nAssistant: "
        );
    }

    #[tokio::test]
    async fn test_complete_returns_text_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-exp:generateContent"))
            .and(header("x-goog-api-key", "gm-test"))
            .and(body_partial_json(json!({
                "generationConfig": {"maxOutputTokens": 4096, "temperature": 0.7}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "I would run "}, {"text": "`df -h`."}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let turns = vec![Turn::user("disk?")];
        let reply = adapter(&server.uri())
            .complete(ChatRequest {
                system_prompt: "sys",
                turns: &turns,
                tools: &[],
            })
            .await
            .unwrap();
        assert_eq!(reply, ModelReply::Final("I would run `df -h`.".into()));
    }

    #[tokio::test]
    async fn test_empty_text_maps_to_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": []}}]
            })))
            .mount(&server)
            .await;

        let turns = vec![Turn::user("?")];
        let reply = adapter(&server.uri())
            .complete(ChatRequest {
                system_prompt: "",
                turns: &turns,
                tools: &[],
            })
            .await
            .unwrap();
        assert_eq!(reply, ModelReply::Final(EMPTY_REPLY.into()));
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let turns = vec![Turn::user("?")];
        let err = adapter(&server.uri())
            .complete(ChatRequest {
                system_prompt: "",
                turns: &turns,
                tools: &[],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 503, .. }));
    }
}
