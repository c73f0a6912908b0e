//! `hostpilot providers` — show configuration and provider status.

use anyhow::Result;
use colored::Colorize;

use hostpilot_core::config::{get_config_path, Config};
use hostpilot_core::utils::expand_home;
use hostpilot_core::ProviderIdentity;
use hostpilot_providers::registry::PROVIDERS;

use crate::helpers::describe_identity;

/// Run the providers command.
pub fn run(config: &Config) -> Result<()> {
    let config_path = get_config_path();

    println!();
    println!("{}", "Hostpilot Providers".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".dimmed().to_string()
        }
    );

    let active = ProviderIdentity::new(config.agent.provider, config.agent.model.clone());
    println!("  {:<18} {}", "Active:".bold(), describe_identity(&active));
    println!(
        "  {:<18} {}",
        "Fallback model:".bold(),
        config.agent.fallback_model
    );
    println!(
        "  {:<18} {} | max_tokens: {}",
        "Parameters:".bold(),
        format!("temp: {}", config.agent.temperature).dimmed(),
        format!("{}", config.agent.max_tokens).dimmed(),
    );
    println!(
        "  {:<18} {}",
        "Logs:".bold(),
        expand_home(&config.paths.log_dir).display()
    );

    println!();
    for spec in PROVIDERS {
        let status = if spec.is_available(config) {
            format!("{}", "✓ available".green())
        } else {
            format!("{}", "· no API key".dimmed())
        };
        println!("    {:<20} {:<8} {}", spec.display_name, spec.name.dimmed(), status);
        println!("    {:<20} {}", "", spec.models.join(", ").dimmed());
    }
    println!();

    Ok(())
}
