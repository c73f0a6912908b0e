//! Provider catalogue — static descriptions of the selectable backends.
//!
//! Feeds `hostpilot providers` and `GET /api/providers`. Each entry maps a
//! catalogue name to the protocol it speaks and the credential that makes it
//! available.

use serde::Serialize;

use hostpilot_core::config::Config;
use hostpilot_core::ProviderKind;

// ─────────────────────────────────────────────
// ProviderSpec — static metadata for one backend
// ─────────────────────────────────────────────

/// Which configured credential decides availability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    AnthropicKey,
    GeminiKey,
    OpenAiKey,
    /// Local endpoint, assumed reachable.
    Always,
}

#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Catalogue name (e.g. `"anthropic"`), accepted by `switch_provider`.
    pub name: &'static str,
    /// Human-readable name. E.g. `"Google Gemini"`.
    pub display_name: &'static str,
    /// Protocol this entry is served by.
    pub kind: ProviderKind,
    pub availability: Availability,
    /// Suggested models, first is the default.
    pub models: &'static [&'static str],
}

impl ProviderSpec {
    pub fn is_available(&self, config: &Config) -> bool {
        let providers = &config.providers;
        match self.availability {
            Availability::AnthropicKey => providers.anthropic.is_configured(),
            Availability::GeminiKey => providers.gemini.is_configured(),
            Availability::OpenAiKey => providers.openai.is_configured(),
            Availability::Always => true,
        }
    }

    pub fn default_model(&self) -> &'static str {
        self.models.first().copied().unwrap_or_default()
    }
}

/// All selectable backends, in display order.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        name: "anthropic",
        display_name: "Anthropic Claude",
        kind: ProviderKind::Native,
        availability: Availability::AnthropicKey,
        models: &[
            "claude-sonnet-4-5",
            "claude-3-5-sonnet-20241022",
            "claude-3-5-haiku-20241022",
            "claude-3-opus-20240229",
        ],
    },
    ProviderSpec {
        name: "gemini",
        display_name: "Google Gemini",
        kind: ProviderKind::NoToolSupport,
        availability: Availability::GeminiKey,
        models: &["gemini-2.0-flash-exp", "gemini-1.5-pro", "gemini-1.5-flash"],
    },
    ProviderSpec {
        name: "openai",
        display_name: "OpenAI",
        kind: ProviderKind::OpenAiCompatible,
        availability: Availability::OpenAiKey,
        models: &["gpt-4o", "gpt-4o-mini", "gpt-3.5-turbo"],
    },
    ProviderSpec {
        name: "ollama",
        display_name: "Ollama (Local)",
        kind: ProviderKind::OpenAiCompatible,
        availability: Availability::Always,
        models: &["llama3.1", "codellama", "mistral", "phi3"],
    },
];

/// Find a catalogue entry by name (case-insensitive).
pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    let name = name.trim().to_lowercase();
    PROVIDERS.iter().find(|s| s.name == name)
}

// ─────────────────────────────────────────────
// Status snapshot (serialized for the HTTP API)
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProviderStatus {
    pub name: &'static str,
    pub available: bool,
    pub models: Vec<&'static str>,
}

/// Availability of every catalogue entry under `config`, keyed by name.
pub fn provider_statuses(config: &Config) -> Vec<(&'static str, ProviderStatus)> {
    PROVIDERS
        .iter()
        .map(|spec| {
            (
                spec.name,
                ProviderStatus {
                    name: spec.display_name,
                    available: spec.is_available(config),
                    models: spec.models.to_vec(),
                },
            )
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_name() {
        assert_eq!(find_by_name("Gemini").unwrap().kind, ProviderKind::NoToolSupport);
        assert_eq!(find_by_name("openai").unwrap().kind, ProviderKind::OpenAiCompatible);
        assert!(find_by_name("mistral").is_none());
    }

    #[test]
    fn test_every_kind_is_reachable() {
        for kind in ProviderKind::ALL {
            assert!(PROVIDERS.iter().any(|s| s.kind == kind), "{kind} missing");
        }
    }

    #[test]
    fn test_catalogue_names_parse_as_kinds() {
        for spec in PROVIDERS {
            assert_eq!(spec.name.parse::<ProviderKind>().unwrap(), spec.kind);
        }
    }

    #[test]
    fn test_availability_follows_credentials() {
        let mut config = Config::default();
        let statuses = provider_statuses(&config);
        let available: Vec<_> = statuses
            .iter()
            .filter(|(_, s)| s.available)
            .map(|(n, _)| *n)
            .collect();
        assert_eq!(available, vec!["ollama"]);

        config.providers.gemini.api_key = "gm".into();
        assert!(find_by_name("gemini").unwrap().is_available(&config));
        assert!(!find_by_name("anthropic").unwrap().is_available(&config));
    }

    #[test]
    fn test_default_model() {
        assert_eq!(find_by_name("ollama").unwrap().default_model(), "llama3.1");
    }
}
