//! Hostpilot core — canonical conversation types, errors, configuration,
//! and small utilities shared by the provider and agent crates.

pub mod config;
pub mod error;
pub mod history;
pub mod types;
pub mod utils;

pub use error::{AgentError, ConversationError, ProviderError};
pub use types::{
    Conversation, ModelReply, ProviderIdentity, ProviderKind, ToolArguments, ToolInvocation,
    ToolResult, ToolSpec, Turn,
};
