//! Provider adapter trait — the seam between the agent loop and each backend.
//!
//! Every backend protocol (Anthropic native, OpenAI-compatible, Gemini)
//! implements [`ProviderAdapter`]. The loop only sees canonical [`Turn`]s in
//! and [`ModelReply`] out.

use async_trait::async_trait;
use hostpilot_core::{ModelReply, ProviderError, ProviderKind, ToolSpec, Turn};

/// Final text used when a model ends its turn without any text.
pub const TASK_COMPLETED: &str = "Task completed";

/// Final text used when the OpenAI-compatible loop exhausts its round-trips.
pub const MAX_ITERATIONS_REACHED: &str = "Maximum iterations reached";

/// Configuration passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Everything an adapter needs for one round-trip.
#[derive(Clone, Copy, Debug)]
pub struct ChatRequest<'a> {
    pub system_prompt: &'a str,
    /// Full conversation so far, oldest first.
    pub turns: &'a [Turn],
    /// Tool catalogue. Adapters without tool support ignore it.
    pub tools: &'a [ToolSpec],
}

/// One backend protocol.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Model sent on the wire.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;

    /// Upper bound on model round-trips within one `chat()` call.
    ///
    /// `None` means the loop runs until the model produces a final answer.
    fn max_round_trips(&self) -> Option<usize> {
        None
    }

    /// Connectivity check run once before a chat turn.
    async fn preflight(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Send the conversation and translate the response.
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ModelReply, ProviderError>;
}
