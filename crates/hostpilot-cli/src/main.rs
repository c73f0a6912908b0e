//! Hostpilot CLI — entry point.
//!
//! # Commands
//!
//! - `hostpilot chat [-m MESSAGE] [--resume TRANSCRIPT]` — single-shot or REPL
//! - `hostpilot providers` — show the provider catalogue and credential status
//! - `hostpilot serve [--host HOST] [--port PORT]` — HTTP + WebSocket server
//! - `hostpilot email` — answer whitelisted senders by email (feature `email`)

#[cfg(feature = "email")]
mod email;
mod helpers;
mod repl;
mod server;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use hostpilot_agent::{AgentSession, LogTarget};
use hostpilot_core::config::{load_config, Config, EnvCredentials};
use hostpilot_core::history::parse_transcript;
use hostpilot_core::utils::expand_home;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Hostpilot — an LLM agent with shell and filesystem access to this host
#[derive(Parser)]
#[command(name = "hostpilot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Replay a previous transcript log before the first message
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show providers, suggested models and credential status
    Providers,

    /// Start the HTTP/WebSocket server
    Serve {
        /// Bind address (overrides HOST / config)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides PORT / config)
        #[arg(long)]
        port: Option<u16>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Poll the inbox and answer authorized senders by email
    #[cfg(feature = "email")]
    Email {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(None, &EnvCredentials).context("invalid configuration")?;

    match cli.command {
        Commands::Chat {
            message,
            resume,
            logs,
        } => {
            init_logging(if logs { "hostpilot=debug,info" } else { "warn" });
            run_chat(&config, message, resume).await
        }
        Commands::Providers => status::run(&config),
        Commands::Serve { host, port, logs } => {
            init_logging(if logs { "hostpilot=debug,info" } else { "info" });
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::run(config).await
        }
        #[cfg(feature = "email")]
        Commands::Email { logs } => {
            init_logging(if logs { "hostpilot=debug,info" } else { "info" });
            email::EmailServer::new(&config)?.run().await
        }
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(config: &Config, message: Option<String>, resume: Option<PathBuf>) -> Result<()> {
    let log_dir = expand_home(&config.paths.log_dir);
    let mut session = AgentSession::from_config(config, LogTarget::Directory(log_dir))
        .context("failed to start agent session")?;

    if let Some(path) = resume {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read transcript: {}", path.display()))?;
        let turns = parse_transcript(&text);
        info!(path = %path.display(), turns = turns.len(), "resuming conversation");
        session.restore_history(turns);
    }

    match message {
        Some(msg) => {
            let response = session.chat(&msg).await.context("agent processing failed")?;
            helpers::print_response(&response);
        }
        None => repl::run(session).await?,
    }

    Ok(())
}

/// Initialize tracing. `RUST_LOG` overrides `default_filter`.
fn init_logging(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
