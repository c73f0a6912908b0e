//! Hostpilot Agent — session loop, host tools, and session logs.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, and the five host tools
//! - **logs**: per-session transcript and actions files
//! - **prompt**: system prompt bootstrap
//! - **session**: the model ↔ tool loop with fallback and provider switching

pub mod logs;
pub mod prompt;
pub mod session;
pub mod tools;

pub use logs::SessionLogs;
pub use session::{AgentSession, LogTarget, ProviderInfo};
pub use tools::{Tool, ToolRegistry};
