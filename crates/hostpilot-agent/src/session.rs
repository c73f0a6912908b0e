//! Agent session — the model ↔ tool loop for one conversation.
//!
//! A session owns its conversation, the active provider binding and its two
//! log files. `chat()` appends the user turn, drives the adapter until it
//! produces final text, and falls back once to the native provider when the
//! active adapter fails.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use hostpilot_core::config::Config;
use hostpilot_core::utils::expand_home;
use hostpilot_core::{
    AgentError, Conversation, ModelReply, ProviderError, ProviderIdentity, ProviderKind, Turn,
};
use hostpilot_providers::{
    AdapterFactory, ChatRequest, HttpAdapterFactory, ProviderAdapter, ProviderBinding,
    MAX_ITERATIONS_REACHED,
};

use crate::logs::SessionLogs;
use crate::prompt;
use crate::tools::ToolRegistry;

/// Where a session writes its logs.
#[derive(Clone, Debug)]
pub enum LogTarget {
    /// `transcripts/` and `actions/` subdirectories of this directory.
    Directory(PathBuf),
    /// This transcript file, with the actions log beside it.
    Transcript(PathBuf),
}

/// Snapshot returned by [`AgentSession::provider_info`].
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ProviderInfo {
    pub provider: ProviderKind,
    pub model: String,
    pub has_anthropic: bool,
    pub has_gemini: bool,
    pub has_openai: bool,
    pub has_ollama: bool,
}

// ─────────────────────────────────────────────
// AgentSession
// ─────────────────────────────────────────────

pub struct AgentSession {
    conversation: Conversation,
    binding: ProviderBinding,
    factory: Arc<dyn AdapterFactory>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    logs: SessionLogs,
}

impl AgentSession {
    /// Bind `identity` and open the session logs.
    ///
    /// Fails with `CredentialMissing` if the provider has no credential.
    pub fn new(
        factory: Arc<dyn AdapterFactory>,
        identity: ProviderIdentity,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
        logs: LogTarget,
    ) -> Result<Self, AgentError> {
        let binding = factory.bind(&identity)?;
        let logs = match logs {
            LogTarget::Directory(dir) => SessionLogs::create(&dir, &identity)?,
            LogTarget::Transcript(path) => SessionLogs::at_transcript(path, &identity)?,
        };

        info!(
            provider = %identity.provider,
            model = %identity.model,
            fallback = binding.fallback.is_some(),
            tools = tools.len(),
            "agent session initialized"
        );

        Ok(Self {
            conversation: Conversation::new(),
            binding,
            factory,
            tools,
            system_prompt: system_prompt.into(),
            logs,
        })
    }

    /// Production wiring: HTTP adapters, the five host tools, the prompt file.
    pub fn from_config(config: &Config, logs: LogTarget) -> Result<Self, AgentError> {
        let factory = Arc::new(HttpAdapterFactory::new(config.clone()));
        let identity = ProviderIdentity::new(config.agent.provider, config.agent.model.clone());
        // Bind before touching the filesystem so a missing key has no side effects.
        factory.bind(&identity)?;

        let tools = Arc::new(ToolRegistry::builtin(Duration::from_secs(
            config.tools.exec_timeout,
        )));
        let system_prompt = prompt::load_or_bootstrap(&expand_home(&config.paths.system_prompt));
        Self::new(factory, identity, tools, system_prompt, logs)
    }

    pub fn identity(&self) -> &ProviderIdentity {
        &self.binding.identity
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn logs(&self) -> &SessionLogs {
        &self.logs
    }

    // ────────────── Chat ──────────────

    /// Send one user message and return the final answer.
    ///
    /// On failure the conversation is rolled back: to just after the user
    /// turn before the fallback runs, and to before it if everything failed.
    pub async fn chat(&mut self, message: &str) -> Result<String, AgentError> {
        self.logs.user(message);
        let before_user = self.conversation.len();
        self.conversation.push(Turn::user(message));
        let after_user = self.conversation.len();

        let adapter = Arc::clone(&self.binding.adapter);
        let primary = match self.drive(adapter.as_ref()).await {
            Ok(text) => return Ok(self.finish(text)),
            Err(e) => e,
        };

        self.conversation.truncate(after_user);
        let Some(fallback) = self.binding.fallback.clone() else {
            warn!(provider = adapter.display_name(), error = %primary, "provider failed, no fallback");
            self.conversation.truncate(before_user);
            return Err(primary.into());
        };

        warn!(
            provider = adapter.display_name(),
            fallback = fallback.display_name(),
            error = %primary,
            "primary provider failed, attempting fallback"
        );
        match self.drive(fallback.as_ref()).await {
            Ok(text) => Ok(self.finish(text)),
            Err(secondary) => {
                warn!(fallback = fallback.display_name(), error = %secondary, "fallback provider failed");
                self.conversation.truncate(before_user);
                Err(AgentError::FallbackFailed {
                    primary,
                    fallback: secondary,
                })
            }
        }
    }

    fn finish(&self, text: String) -> String {
        info!(response = %hostpilot_core::utils::truncate_string(&text, 100), "agent response");
        self.logs.agent(&text);
        text
    }

    /// Run the loop against one adapter until it yields final text.
    async fn drive(&mut self, adapter: &dyn ProviderAdapter) -> Result<String, ProviderError> {
        adapter.preflight().await?;

        let tools = if adapter.kind().supports_tools() {
            self.tools.list()
        } else {
            Vec::new()
        };

        let mut round_trips = 0usize;
        loop {
            if adapter.max_round_trips().is_some_and(|max| round_trips >= max) {
                warn!(provider = adapter.display_name(), round_trips, "iteration bound reached");
                self.conversation.push(Turn::assistant(MAX_ITERATIONS_REACHED));
                return Ok(MAX_ITERATIONS_REACHED.to_string());
            }
            round_trips += 1;
            debug!(provider = adapter.display_name(), iteration = round_trips, "LLM call");

            let reply = adapter
                .complete(ChatRequest {
                    system_prompt: &self.system_prompt,
                    turns: self.conversation.turns(),
                    tools: &tools,
                })
                .await?;

            match reply {
                ModelReply::Final(text) => {
                    self.conversation.push(Turn::assistant(text.clone()));
                    return Ok(text);
                }
                ModelReply::ToolCalls { text, invocations } => {
                    self.conversation
                        .push(Turn::assistant_tool_calls(text, invocations.clone()));

                    for invocation in invocations {
                        info!(tool = %invocation.tool_name, iteration = round_trips, "executing tool call");
                        let result = self
                            .tools
                            .execute(&invocation.tool_name, invocation.arguments.clone())
                            .await;
                        self.logs.tool(&invocation, &result);
                        self.conversation.push(Turn::tool_result(invocation.id, result));
                    }
                }
            }
        }
    }

    // ────────────── Session control ──────────────

    /// Clear the conversation. Identity and logs are kept.
    pub fn reset(&mut self) {
        self.conversation.clear();
        self.logs.reset();
        info!("conversation reset");
    }

    /// Switch provider (and optionally model). The new binding is built
    /// first; on error the session is unchanged.
    pub fn switch_provider(
        &mut self,
        provider: ProviderKind,
        model: Option<String>,
    ) -> Result<(), AgentError> {
        let model = model.unwrap_or_else(|| self.binding.identity.model.clone());
        let identity = ProviderIdentity::new(provider, model);

        let binding = self.factory.bind(&identity).inspect_err(|e| {
            warn!(provider = %provider, error = %e, "failed to switch provider");
        })?;
        let previous = std::mem::replace(&mut self.binding, binding);

        info!(from = %previous.identity, to = %self.binding.identity, "switched provider");
        self.logs
            .provider_switched(&previous.identity, &self.binding.identity);
        Ok(())
    }

    pub fn provider_info(&self) -> ProviderInfo {
        let flags = self.factory.credential_flags();
        ProviderInfo {
            provider: self.binding.identity.provider,
            model: self.binding.identity.model.clone(),
            has_anthropic: flags.has_anthropic,
            has_gemini: flags.has_gemini,
            has_openai: flags.has_openai,
            has_ollama: true,
        }
    }

    /// Replace the conversation with replayed turns (see
    /// [`hostpilot_core::history::parse_transcript`]).
    pub fn restore_history(&mut self, turns: Vec<Turn>) {
        info!(turns = turns.len(), "restored conversation history");
        self.conversation = Conversation::from_turns(turns);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
