//! Interactive REPL over one agent session.
//!
//! Uses `rustyline` for readline-style editing with persistent history.

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use hostpilot_agent::AgentSession;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// What a line of REPL input asks for.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Exit,
    Reset,
    Message(&'a str),
    Empty,
}

fn classify(input: &str) -> ReplCommand<'_> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }
    let lower = trimmed.to_lowercase();
    if EXIT_COMMANDS.contains(&lower.as_str()) {
        ReplCommand::Exit
    } else if lower == "reset" || lower == "/reset" {
        ReplCommand::Reset
    } else {
        ReplCommand::Message(trimmed)
    }
}

/// Run the interactive REPL loop.
pub async fn run(mut session: AgentSession) -> Result<()> {
    helpers::print_banner(session.identity(), session.conversation().len());

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let message = match classify(&input) {
            ReplCommand::Empty => continue,
            ReplCommand::Exit => {
                println!("\nGoodbye!");
                break;
            }
            ReplCommand::Reset => {
                session.reset();
                println!("{}\n", "Conversation reset.".dimmed());
                continue;
            }
            ReplCommand::Message(message) => message,
        };

        let _ = editor.add_history_entry(&input);

        debug!(input = message, "processing input");
        helpers::print_thinking();

        let result = session.chat(message).await;
        helpers::clear_thinking();
        match result {
            Ok(response) => helpers::print_response(&response),
            Err(e) => eprintln!("\n{} {e}\n", "Error:".red().bold()),
        }
    }

    save_history(&mut editor);

    Ok(())
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

fn history_path() -> std::path::PathBuf {
    hostpilot_core::utils::get_data_path()
        .join("history")
        .join("cli_history")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
