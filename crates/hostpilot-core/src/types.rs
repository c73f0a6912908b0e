//! Canonical conversation types shared by every provider adapter.
//!
//! Provider wire formats never leak past the adapters: the agent loop only
//! sees [`Turn`], [`ToolInvocation`], [`ToolResult`] and [`ModelReply`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, ConversationError};

/// Arguments of a tool invocation, keyed by parameter name.
pub type ToolArguments = HashMap<String, Value>;

// ─────────────────────────────────────────────
// Tool invocations and results
// ─────────────────────────────────────────────

/// A structured request from the model to run one tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    /// Provider-assigned correlation id. Echoed back in the result turn.
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Outcome of a tool execution, serialized as the flat JSON object the model reads.
///
/// `Error` is producible by every tool; the other variants are tool-specific.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolResult {
    /// `run_bash`
    Command {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
    /// `read_file`
    FileRead { content: String, path: String },
    /// `write_file`
    FileWrite { success: bool, path: String },
    /// `list_directory`
    Listing {
        listing: String,
        stderr: String,
        exit_code: i32,
    },
    /// `search_files`
    Search { results: String },
    Error { error: String },
}

impl ToolResult {
    pub fn error(message: impl Into<String>) -> Self {
        ToolResult::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error { .. })
    }

    /// Single-line JSON encoding, used as tool-result content on the wire.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("unserializable tool result: {e}") }).to_string()
        })
    }
}

// ─────────────────────────────────────────────
// Turns and the conversation
// ─────────────────────────────────────────────

/// One unit of conversation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Turn {
    #[serde(rename = "user")]
    User { text: String },

    #[serde(rename = "assistant")]
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_invocations: Vec<ToolInvocation>,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        invocation_id: String,
        result: ToolResult,
    },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    /// A plain assistant answer with no tool calls.
    pub fn assistant(text: impl Into<String>) -> Self {
        Turn::Assistant {
            text: Some(text.into()),
            tool_invocations: Vec::new(),
        }
    }

    pub fn assistant_tool_calls(text: Option<String>, tool_invocations: Vec<ToolInvocation>) -> Self {
        Turn::Assistant {
            text,
            tool_invocations,
        }
    }

    pub fn tool_result(invocation_id: impl Into<String>, result: ToolResult) -> Self {
        Turn::ToolResult {
            invocation_id: invocation_id.into(),
            result,
        }
    }
}

/// Ordered, append-only list of turns owned by one session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Drop every turn after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }

    /// Check that every tool result answers an invocation of the immediately
    /// preceding assistant turn, and that no invocation is left unanswered.
    pub fn validate(&self) -> Result<(), ConversationError> {
        let mut pending: Vec<&str> = Vec::new();

        for (index, turn) in self.turns.iter().enumerate() {
            match turn {
                Turn::ToolResult { invocation_id, .. } => {
                    match pending.iter().position(|id| *id == invocation_id.as_str()) {
                        Some(pos) => {
                            pending.remove(pos);
                        }
                        None => {
                            return Err(ConversationError::OrphanResult {
                                index,
                                invocation_id: invocation_id.clone(),
                            })
                        }
                    }
                }
                Turn::User { .. } | Turn::Assistant { .. } => {
                    if let Some(id) = pending.first() {
                        return Err(ConversationError::UnansweredInvocation {
                            invocation_id: id.to_string(),
                        });
                    }
                    if let Turn::Assistant {
                        tool_invocations, ..
                    } = turn
                    {
                        pending = tool_invocations.iter().map(|i| i.id.as_str()).collect();
                    }
                }
            }
        }

        match pending.first() {
            Some(id) => Err(ConversationError::UnansweredInvocation {
                invocation_id: id.to_string(),
            }),
            None => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────
// Tool catalogue entries
// ─────────────────────────────────────────────

/// Catalogue entry describing one tool to the model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema: `{"type": "object", "properties": {...}, "required": [...]}`.
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

// ─────────────────────────────────────────────
// Model replies
// ─────────────────────────────────────────────

/// Canonical outcome of one provider round-trip.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelReply {
    /// Terminal answer for the caller.
    Final(String),
    /// The model wants tools run before it answers.
    ToolCalls {
        text: Option<String>,
        invocations: Vec<ToolInvocation>,
    },
}

// ─────────────────────────────────────────────
// Provider identity
// ─────────────────────────────────────────────

/// The three supported provider protocols.
///
/// Serialized under the backend names used in configuration and on the HTTP
/// API (`anthropic`, `ollama`, `gemini`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Anthropic Messages API with native tool use.
    #[serde(rename = "anthropic", alias = "native")]
    Native,
    /// OpenAI-compatible `/chat/completions` (Ollama by default).
    #[serde(rename = "ollama", alias = "openai", alias = "openai-compatible")]
    OpenAiCompatible,
    /// Gemini `generateContent`, used without tools.
    #[serde(rename = "gemini", alias = "no-tool-support")]
    NoToolSupport,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Native,
        ProviderKind::OpenAiCompatible,
        ProviderKind::NoToolSupport,
    ];

    /// Name used in config, logs and the HTTP API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Native => "anthropic",
            ProviderKind::OpenAiCompatible => "ollama",
            ProviderKind::NoToolSupport => "gemini",
        }
    }

    pub fn supports_tools(&self) -> bool {
        !matches!(self, ProviderKind::NoToolSupport)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "native" => Ok(ProviderKind::Native),
            "ollama" | "openai" | "openai-compatible" => Ok(ProviderKind::OpenAiCompatible),
            "gemini" | "no-tool-support" => Ok(ProviderKind::NoToolSupport),
            _ => Err(AgentError::UnknownProvider(s.to_string())),
        }
    }
}

/// Which provider and model a session is talking to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub provider: ProviderKind,
    pub model: String,
}

impl ProviderIdentity {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.provider, self.model)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
