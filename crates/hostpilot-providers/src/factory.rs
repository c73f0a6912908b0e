//! Adapter construction from configuration.
//!
//! A [`ProviderBinding`] is what a session holds: the identity it reports,
//! the adapter that serves it, and the optional native fallback.

use std::sync::Arc;

use tracing::debug;

use hostpilot_core::config::Config;
use hostpilot_core::{AgentError, ProviderIdentity, ProviderKind};

use crate::anthropic::AnthropicAdapter;
use crate::gemini::GeminiAdapter;
use crate::openai_compat::OpenAiCompatAdapter;
use crate::traits::{LlmRequestConfig, ProviderAdapter};

/// Active adapter plus the one-shot fallback used when it fails.
#[derive(Clone)]
pub struct ProviderBinding {
    pub identity: ProviderIdentity,
    pub adapter: Arc<dyn ProviderAdapter>,
    pub fallback: Option<Arc<dyn ProviderAdapter>>,
}

impl std::fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBinding")
            .field("identity", &self.identity)
            .field("adapter", &self.adapter.display_name())
            .field("fallback", &self.fallback.as_ref().map(|a| a.display_name().to_string()))
            .finish()
    }
}

/// Builds bindings for a requested identity.
///
/// Implementations must fail with `CredentialMissing` when the identity's
/// provider has no credential, without side effects.
pub trait AdapterFactory: Send + Sync {
    fn bind(&self, identity: &ProviderIdentity) -> Result<ProviderBinding, AgentError>;

    /// `has_anthropic` / `has_gemini` / `has_openai` flags for `provider_info()`.
    fn credential_flags(&self) -> CredentialFlags;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CredentialFlags {
    pub has_anthropic: bool,
    pub has_gemini: bool,
    pub has_openai: bool,
}

// ─────────────────────────────────────────────
// HttpAdapterFactory
// ─────────────────────────────────────────────

/// Production factory: real HTTP adapters built from [`Config`].
#[derive(Clone, Debug)]
pub struct HttpAdapterFactory {
    config: Config,
}

impl HttpAdapterFactory {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn request_config(&self) -> LlmRequestConfig {
        LlmRequestConfig {
            max_tokens: self.config.agent.max_tokens,
            temperature: self.config.agent.temperature,
        }
    }

    /// The native API only serves Claude models.
    fn native_model<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.contains("claude") {
            requested
        } else {
            &self.config.agent.fallback_model
        }
    }

    fn build(&self, identity: &ProviderIdentity) -> Result<Arc<dyn ProviderAdapter>, AgentError> {
        let credential = self.config.credential_for(identity.provider)?;
        let request_config = self.request_config();

        let adapter: Arc<dyn ProviderAdapter> = match identity.provider {
            ProviderKind::Native => Arc::new(AnthropicAdapter::new(
                &credential,
                self.native_model(&identity.model),
                request_config,
            )),
            ProviderKind::OpenAiCompatible => Arc::new(
                OpenAiCompatAdapter::new(&credential, &identity.model, request_config)
                    .with_health_check(self.config.providers.ollama_health_check),
            ),
            ProviderKind::NoToolSupport => Arc::new(GeminiAdapter::new(
                &credential,
                &identity.model,
                request_config,
            )),
        };

        debug!(
            provider = %identity.provider,
            model = adapter.model(),
            api_base = credential.api_base.as_deref().unwrap_or("default"),
            "Creating LLM provider"
        );
        Ok(adapter)
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn bind(&self, identity: &ProviderIdentity) -> Result<ProviderBinding, AgentError> {
        let adapter = self.build(identity)?;

        let fallback = if identity.provider != ProviderKind::Native
            && self.config.has_credential(ProviderKind::Native)
        {
            let fallback_identity = ProviderIdentity::new(ProviderKind::Native, identity.model.clone());
            Some(self.build(&fallback_identity)?)
        } else {
            None
        };

        Ok(ProviderBinding {
            identity: identity.clone(),
            adapter,
            fallback,
        })
    }

    fn credential_flags(&self) -> CredentialFlags {
        CredentialFlags {
            has_anthropic: self.config.has_credential(ProviderKind::Native),
            has_gemini: self.config.has_credential(ProviderKind::NoToolSupport),
            has_openai: self.config.providers.openai.is_configured(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config(anthropic: &str, gemini: &str) -> Config {
        let mut config = Config::default();
        config.providers.anthropic.api_key = anthropic.into();
        config.providers.gemini.api_key = gemini.into();
        config
    }

    #[test]
    fn test_missing_credential_fails_bind() {
        let factory = HttpAdapterFactory::new(config("", ""));
        let err = factory
            .bind(&ProviderIdentity::new(ProviderKind::NoToolSupport, "gemini-2.0-flash-exp"))
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::CredentialMissing {
                env_key: "GEMINI_API_KEY",
                ..
            }
        ));
    }

    #[test]
    fn test_gemini_with_anthropic_gets_native_fallback() {
        let factory = HttpAdapterFactory::new(config("sk-ant", "gm"));
        let binding = factory
            .bind(&ProviderIdentity::new(ProviderKind::NoToolSupport, "gemini-2.0-flash-exp"))
            .unwrap();
        assert_eq!(binding.adapter.kind(), ProviderKind::NoToolSupport);
        let fallback = binding.fallback.expect("native fallback");
        assert_eq!(fallback.kind(), ProviderKind::Native);
        assert_eq!(fallback.model(), "claude-sonnet-4-5");
    }

    #[test]
    fn test_native_has_no_fallback_and_keeps_claude_model() {
        let factory = HttpAdapterFactory::new(config("sk-ant", ""));
        let binding = factory
            .bind(&ProviderIdentity::new(ProviderKind::Native, "claude-3-5-haiku-20241022"))
            .unwrap();
        assert!(binding.fallback.is_none());
        assert_eq!(binding.adapter.model(), "claude-3-5-haiku-20241022");
        assert_eq!(binding.identity.model, "claude-3-5-haiku-20241022");
    }

    #[test]
    fn test_native_coerces_non_claude_model() {
        let factory = HttpAdapterFactory::new(config("sk-ant", ""));
        let binding = factory
            .bind(&ProviderIdentity::new(ProviderKind::Native, "gpt-4o"))
            .unwrap();
        assert_eq!(binding.adapter.model(), "claude-sonnet-4-5");
        assert_eq!(binding.identity.model, "gpt-4o");
    }

    #[test]
    fn test_ollama_always_binds() {
        let factory = HttpAdapterFactory::new(config("", ""));
        let binding = factory
            .bind(&ProviderIdentity::new(ProviderKind::OpenAiCompatible, "llama3.1"))
            .unwrap();
        assert_eq!(binding.adapter.max_round_trips(), Some(10));
        assert!(binding.fallback.is_none());
    }

    #[test]
    fn test_credential_flags() {
        let factory = HttpAdapterFactory::new(config("sk-ant", ""));
        assert_eq!(
            factory.credential_flags(),
            CredentialFlags {
                has_anthropic: true,
                has_gemini: false,
                has_openai: false,
            }
        );
    }
}
