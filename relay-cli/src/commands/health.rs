//! Health command handler

use anyhow::Result;
use colored::*;

use crate::api::ApiClient;
use crate::config::Config;

pub async fn handle_health_command(config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);
    let health = client.health().await?;

    let status = if health.status == "healthy" {
        health.status.green().bold()
    } else {
        health.status.red().bold()
    };

    println!("{} {} {}", health.service.bold(), health.version.dimmed(), status);

    if let Some(circuit) = health.upstream_circuit {
        let circuit = match circuit.as_str() {
            "closed" => circuit.green(),
            "half_open" => circuit.yellow(),
            _ => circuit.red(),
        };
        println!("  {} {}", "Upstream circuit:".dimmed(), circuit);
    }

    Ok(())
}
