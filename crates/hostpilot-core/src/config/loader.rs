//! Config loader — reads `~/.hostpilot/config.json`, then applies
//! credential-source overrides.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.hostpilot/config.json`
//! 3. Credential source (`AI_PROVIDER`, `AI_MODEL`, `*_API_KEY`, `OLLAMA_URL`, …)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::credentials::{self as keys, CredentialSource};
use super::schema::{parse_address_list, Config};
use crate::error::AgentError;
use crate::types::ProviderKind;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from `path` (or the default path) + credential overrides.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
/// An `AI_PROVIDER` naming no known backend is an error.
pub fn load_config(
    path: Option<&Path>,
    source: &dyn CredentialSource,
) -> Result<Config, AgentError> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_overrides(load_config_from_path(&config_path), source)
}

/// Load config from a specific file path, without overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Apply credential-source overrides on top of a loaded config.
fn apply_overrides(mut config: Config, source: &dyn CredentialSource) -> Result<Config, AgentError> {
    if let Some(val) = source.get(keys::AI_PROVIDER) {
        config.agent.provider = val.parse::<ProviderKind>()?;
    }
    if let Some(val) = source.get(keys::AI_MODEL) {
        config.agent.model = val;
    }

    if let Some(val) = source.get(keys::ANTHROPIC_API_KEY) {
        config.providers.anthropic.api_key = val;
    }
    if let Some(val) = source.get(keys::OPENAI_API_KEY) {
        config.providers.openai.api_key = val;
    }
    if let Some(val) = source.get(keys::GEMINI_API_KEY) {
        config.providers.gemini.api_key = val;
    }
    if let Some(val) = source.get(keys::OLLAMA_URL) {
        config.providers.ollama.api_base = Some(val);
    }

    if let Some(val) = source.get(keys::LOG_DIR) {
        config.paths.log_dir = val;
    }
    if let Some(val) = source.get(keys::SYSTEM_PROMPT) {
        config.paths.system_prompt = val;
    }

    if let Some(val) = source.get(keys::HOST) {
        config.server.host = val;
    }
    if let Some(port) = parse_port(source, keys::PORT) {
        config.server.port = port;
    }

    if let Some(val) = source.get(keys::EMAIL_ADDRESS) {
        config.email.address = val;
    }
    if let Some(val) = source.get(keys::EMAIL_PASSWORD) {
        config.email.password = val;
    }
    if let Some(val) = source.get(keys::AUTHORIZED_EMAILS) {
        config.email.authorized = parse_address_list(&val);
    }
    if let Some(val) = source.get(keys::IMAP_SERVER) {
        config.email.imap_host = val;
    }
    if let Some(port) = parse_port(source, keys::IMAP_PORT) {
        config.email.imap_port = port;
    }
    if let Some(val) = source.get(keys::SMTP_SERVER) {
        config.email.smtp_host = val;
    }
    if let Some(port) = parse_port(source, keys::SMTP_PORT) {
        config.email.smtp_port = port;
    }

    Ok(config)
}

fn parse_port(source: &dyn CredentialSource, key: &str) -> Option<u16> {
    let val = source.get(key)?;
    val.parse()
        .inspect_err(|e| warn!(key, value = %val, error = %e, "ignoring port override"))
        .ok()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_missing_file() {
        let config =
            load_config(Some(Path::new("/nonexistent/path/config.json")), &source(&[])).unwrap();
        assert_eq!(config.agent.max_tokens, 4096);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "agent": {
                "provider": "ollama",
                "model": "llama3.1",
                "maxTokens": 2048
            }
        }"#,
        );

        let config = load_config(Some(file.path()), &source(&[])).unwrap();
        assert_eq!(config.agent.provider, ProviderKind::OpenAiCompatible);
        assert_eq!(config.agent.model, "llama3.1");
        assert_eq!(config.agent.max_tokens, 2048);
        // Default preserved
        assert_eq!(config.agent.temperature, 0.7);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config(Some(file.path()), &source(&[])).unwrap();
        assert_eq!(config.agent.model, "gemini-2.0-flash-exp");
    }

    #[test]
    fn test_overrides_beat_file() {
        let file = write_temp_json(r#"{ "agent": { "model": "from-file" } }"#);
        let config = load_config(
            Some(file.path()),
            &source(&[
                ("AI_PROVIDER", "anthropic"),
                ("AI_MODEL", "claude-3-5-haiku-20241022"),
                ("ANTHROPIC_API_KEY", "sk-ant-env"),
                ("OLLAMA_URL", "http://10.0.0.2:11434/v1"),
                ("PORT", "9001"),
            ]),
        )
        .unwrap();
        assert_eq!(config.agent.provider, ProviderKind::Native);
        assert_eq!(config.agent.model, "claude-3-5-haiku-20241022");
        assert_eq!(config.providers.anthropic.api_key, "sk-ant-env");
        assert_eq!(
            config.providers.ollama.api_base.as_deref(),
            Some("http://10.0.0.2:11434/v1")
        );
        assert_eq!(config.server.port, 9001);
    }

    #[test]
    fn test_unknown_provider_override_is_rejected() {
        let err = load_config(
            Some(Path::new("/nonexistent/config.json")),
            &source(&[("AI_PROVIDER", "antrhopic"), ("GEMINI_API_KEY", "g")]),
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::UnknownProvider(ref name) if name == "antrhopic"));
        assert_eq!(err.to_string(), "Unknown provider: antrhopic");
    }

    #[test]
    fn test_provider_override_is_case_insensitive() {
        let config = load_config(
            Some(Path::new("/nonexistent/config.json")),
            &source(&[("AI_PROVIDER", " Ollama ")]),
        )
        .unwrap();
        assert_eq!(config.agent.provider, ProviderKind::OpenAiCompatible);
    }

    #[test]
    fn test_bad_port_override_keeps_default() {
        let config = load_config(
            Some(Path::new("/nonexistent/config.json")),
            &source(&[("PORT", "not-a-port")]),
        )
        .unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_email_overrides() {
        let config = load_config(
            Some(Path::new("/nonexistent/config.json")),
            &source(&[
                ("EMAIL_ADDRESS", "agent@example.com"),
                ("EMAIL_PASSWORD", "app-pass"),
                ("AUTHORIZED_EMAILS", "Me@Example.com, ops@example.com"),
                ("IMAP_SERVER", "imap.example.com"),
                ("SMTP_PORT", "465"),
            ]),
        )
        .unwrap();
        assert_eq!(config.email.address, "agent@example.com");
        assert_eq!(config.email.password, "app-pass");
        assert_eq!(config.email.authorized, vec!["me@example.com", "ops@example.com"]);
        assert_eq!(config.email.imap_host, "imap.example.com");
        assert_eq!(config.email.imap_port, 993);
        assert_eq!(config.email.smtp_port, 465);
    }
}
