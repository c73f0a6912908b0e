//! Credential source — environment-style key/value lookup.
//!
//! Sessions never read `std::env` directly; they go through a
//! [`CredentialSource`] so tests and embedders can supply their own values.

use std::collections::HashMap;

pub const AI_PROVIDER: &str = "AI_PROVIDER";
pub const AI_MODEL: &str = "AI_MODEL";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const OLLAMA_URL: &str = "OLLAMA_URL";
pub const LOG_DIR: &str = "HOSTPILOT_LOG_DIR";
pub const SYSTEM_PROMPT: &str = "HOSTPILOT_SYSTEM_PROMPT";
pub const HOST: &str = "HOST";
pub const PORT: &str = "PORT";
pub const EMAIL_ADDRESS: &str = "EMAIL_ADDRESS";
pub const EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";
pub const AUTHORIZED_EMAILS: &str = "AUTHORIZED_EMAILS";
pub const IMAP_SERVER: &str = "IMAP_SERVER";
pub const IMAP_PORT: &str = "IMAP_PORT";
pub const SMTP_SERVER: &str = "SMTP_SERVER";
pub const SMTP_PORT: &str = "SMTP_PORT";

/// Lookup of secrets and provider selection by key.
pub trait CredentialSource: Send + Sync {
    /// Value for `key`, or `None` when unset. Empty values count as unset.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads credentials from the process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl CredentialSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).filter(|v| !v.is_empty()).cloned()
    }
}
