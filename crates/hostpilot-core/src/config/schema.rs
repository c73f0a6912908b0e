//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentDefaults`, `ProvidersConfig`, `ToolsConfig`,
//! `PathsConfig`, `ServerConfig`, `EmailConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::types::ProviderKind;

/// Ollama's OpenAI-compatible endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";

/// API key sent to Ollama, which ignores it.
pub const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.hostpilot/config.json` + credential overrides.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentDefaults,
    pub providers: ProvidersConfig,
    pub tools: ToolsConfig,
    pub paths: PathsConfig,
    pub server: ServerConfig,
    pub email: EmailConfig,
}

impl Config {
    /// Credential for `provider`, or `CredentialMissing` if its key isn't set.
    ///
    /// The OpenAI-compatible provider always resolves: it defaults to a local
    /// Ollama endpoint with a placeholder key.
    pub fn credential_for(&self, provider: ProviderKind) -> Result<ProviderConfig, AgentError> {
        match provider {
            ProviderKind::Native => {
                require_key(&self.providers.anthropic, provider, "ANTHROPIC_API_KEY")
            }
            ProviderKind::NoToolSupport => {
                require_key(&self.providers.gemini, provider, "GEMINI_API_KEY")
            }
            ProviderKind::OpenAiCompatible => {
                let api_key = if self.providers.openai.is_configured() {
                    self.providers.openai.api_key.clone()
                } else {
                    OLLAMA_PLACEHOLDER_KEY.to_string()
                };
                let api_base = self
                    .providers
                    .ollama
                    .api_base
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
                Ok(ProviderConfig {
                    api_key,
                    api_base: Some(api_base),
                })
            }
        }
    }

    /// Whether `provider` has the credential it needs.
    pub fn has_credential(&self, provider: ProviderKind) -> bool {
        self.credential_for(provider).is_ok()
    }
}

fn require_key(
    config: &ProviderConfig,
    provider: ProviderKind,
    env_key: &'static str,
) -> Result<ProviderConfig, AgentError> {
    if config.is_configured() {
        Ok(config.clone())
    } else {
        Err(AgentError::CredentialMissing { provider, env_key })
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Default agent settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentDefaults {
    /// Provider used for new sessions.
    pub provider: ProviderKind,
    /// Model identifier for the active provider.
    pub model: String,
    /// Claude model used by the native provider when `model` isn't a Claude model
    /// (including when it serves as the fallback).
    pub fallback_model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            provider: ProviderKind::NoToolSupport,
            model: "gemini-2.0-flash-exp".to_string(),
            fallback_model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single LLM provider (API key, base URL).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider configurations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: ProviderConfig,
    /// Only the key is used; it authenticates against the OpenAI-compatible endpoint.
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub gemini: ProviderConfig,
    /// Only the base URL is used.
    #[serde(default)]
    pub ollama: ProviderConfig,
    /// Probe `<base>/api/tags` before each chat on the OpenAI-compatible provider.
    #[serde(default = "default_true")]
    pub ollama_health_check: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: ProviderConfig::default(),
            openai: ProviderConfig::default(),
            gemini: ProviderConfig::default(),
            ollama: ProviderConfig::default(),
            ollama_health_check: true,
        }
    }
}

// ─────────────────────────────────────────────
// Tools / paths / server
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// Hard timeout for subprocess tools, in seconds.
    pub exec_timeout: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { exec_timeout: 60 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathsConfig {
    /// Root of the `transcripts/` and `actions/` log directories.
    pub log_dir: String,
    /// System prompt file; created with the built-in prompt if missing.
    pub system_prompt: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_dir: "~/.hostpilot/logs".to_string(),
            system_prompt: "~/.hostpilot/system-prompt.txt".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

// ─────────────────────────────────────────────
// Email
// ─────────────────────────────────────────────

/// Mailbox the `email` command polls and answers from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailConfig {
    /// Inbox address; also the IMAP/SMTP login and the reply sender.
    pub address: String,
    /// Account password (an app password for Gmail).
    pub password: String,
    /// Senders allowed to talk to the agent, lowercase.
    pub authorized: Vec<String>,
    pub imap_host: String,
    pub imap_port: u16,
    pub imap_use_ssl: bool,
    pub smtp_host: String,
    /// 465 uses implicit TLS, anything else STARTTLS.
    pub smtp_port: u16,
    pub poll_interval_secs: u64,
    /// Delay before the next poll after a failed one.
    pub retry_delay_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            password: String::new(),
            authorized: Vec::new(),
            imap_host: "imap.gmail.com".to_string(),
            imap_port: 993,
            imap_use_ssl: true,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            poll_interval_secs: 15,
            retry_delay_secs: 30,
        }
    }
}

impl EmailConfig {
    /// Whether `sender` (a bare address) may use the agent.
    pub fn is_authorized(&self, sender: &str) -> bool {
        let sender = sender.trim().to_lowercase();
        self.authorized.iter().any(|a| a.to_lowercase() == sender)
    }
}

/// Split a comma-separated address list, dropping blanks.
pub fn parse_address_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect()
}
