//! LLM provider layer for Hostpilot.
//!
//! # Architecture
//!
//! - [`traits::ProviderAdapter`] — trait that every backend protocol implements
//! - [`anthropic::AnthropicAdapter`] — Anthropic Messages API, native tool use
//! - [`openai_compat::OpenAiCompatAdapter`] — `/chat/completions` (Ollama, OpenAI)
//! - [`gemini::GeminiAdapter`] — Gemini `generateContent`, no tools
//! - [`factory`] — builds adapter + fallback bindings from config
//! - [`registry`] — static provider catalogue

pub mod anthropic;
pub mod factory;
pub mod gemini;
mod http;
pub mod openai_compat;
pub mod registry;
pub mod traits;

pub use anthropic::AnthropicAdapter;
pub use factory::{AdapterFactory, CredentialFlags, HttpAdapterFactory, ProviderBinding};
pub use gemini::GeminiAdapter;
pub use openai_compat::OpenAiCompatAdapter;
pub use registry::{ProviderSpec, PROVIDERS};
pub use traits::{
    ChatRequest, LlmRequestConfig, ProviderAdapter, MAX_ITERATIONS_REACHED, TASK_COMPLETED,
};
