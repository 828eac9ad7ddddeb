//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod health;
mod process;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch changed orders and relay transitions to the webhook
    Process(process::ProcessArgs),
    /// Check relay server health
    Health,
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Process(args) => process::handle_process_command(args, config).await,
        Commands::Health => health::handle_health_command(config).await,
    }
}
