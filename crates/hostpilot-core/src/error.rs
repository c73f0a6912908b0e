//! Error taxonomy.
//!
//! Tool failures never appear here: they are captured into
//! [`ToolResult::Error`](crate::types::ToolResult) and shown to the model.
//! Only construction-time credential problems and provider failures that
//! survive the fallback reach the caller.

use thiserror::Error;

use crate::types::ProviderKind;

/// Failure of a single provider round-trip.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Connection, DNS, timeout or body-read failure.
    #[error("{provider}: network error: {message}")]
    Transport { provider: String, message: String },

    /// Non-success HTTP status (authentication, rate limit, server error).
    #[error("{provider}: API error {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// The response did not have the shape the adapter expects.
    #[error("{provider}: malformed response: {message}")]
    Protocol { provider: String, message: String },
}

impl ProviderError {
    pub fn transport(provider: impl Into<String>, message: impl ToString) -> Self {
        ProviderError::Transport {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn protocol(provider: impl Into<String>, message: impl ToString) -> Self {
        ProviderError::Protocol {
            provider: provider.into(),
            message: message.to_string(),
        }
    }
}

/// Errors surfaced to whoever owns an agent session.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{env_key} not found (required by provider '{provider}')")]
    CredentialMissing {
        provider: ProviderKind,
        env_key: &'static str,
    },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("primary provider failed ({primary}); fallback provider failed ({fallback})")]
    FallbackFailed {
        primary: ProviderError,
        fallback: ProviderError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Broken invocation/result correlation inside a conversation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConversationError {
    #[error("tool result at turn {index} references unknown invocation '{invocation_id}'")]
    OrphanResult { index: usize, invocation_id: String },

    #[error("invocation '{invocation_id}' has no matching tool result")]
    UnansweredInvocation { invocation_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_missing_message() {
        let err = AgentError::CredentialMissing {
            provider: ProviderKind::Native,
            env_key: "ANTHROPIC_API_KEY",
        };
        assert_eq!(
            err.to_string(),
            "ANTHROPIC_API_KEY not found (required by provider 'anthropic')"
        );
    }

    #[test]
    fn test_provider_error_converts_transparently() {
        let err: AgentError = ProviderError::transport("Gemini", "connection refused").into();
        assert_eq!(err.to_string(), "Gemini: network error: connection refused");
    }
}
