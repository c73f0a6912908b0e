//! Shared CLI helpers — response printing, banner, thinking indicator.

use colored::Colorize;

use hostpilot_core::ProviderIdentity;

/// `provider / model` as shown in the banner and status output.
pub fn describe_identity(identity: &ProviderIdentity) -> String {
    format!("{} / {}", identity.provider, identity.model)
}

/// Print an agent response to stdout.
pub fn print_response(response: &str) {
    println!();
    println!("{}", "Agent".cyan().bold());
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Print the banner shown at REPL start.
pub fn print_banner(identity: &ProviderIdentity, restored_turns: usize) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "Hostpilot".cyan().bold(), version.dimmed());
    println!("  {}", describe_identity(identity).dimmed());
    if restored_turns > 0 {
        println!(
            "  {}",
            format!("resumed {restored_turns} turns from transcript").dimmed()
        );
    }
    println!(
        "{}",
        "Type a message, \"reset\" to start over, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder while the agent works.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}
