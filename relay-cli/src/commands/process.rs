//! Process command handler
//!
//! Triggers one relay run and prints its summary.

use anyhow::Result;
use clap::Args;
use colored::*;
use relay_core::domain::run::RunResult;
use relay_core::dto::process::ProcessRequest;

use crate::api::ApiClient;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Upstream integration key
    #[arg(long, env = "DROPI_API_KEY")]
    pub api_key: String,

    /// Status-change date (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,

    /// Country suffix (co, mx, cl, ar, ec, gt, pa, pe, com.py)
    #[arg(long, default_value = "co")]
    pub country: String,

    /// Path appended to the webhook base URL
    #[arg(long)]
    pub webhook_suffix: String,

    /// Optional upper date bound (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<String>,

    /// Workspace identifier attached to server logs
    #[arg(long)]
    pub workspace: Option<String>,
}

impl ProcessArgs {
    pub fn into_request(self) -> ProcessRequest {
        ProcessRequest {
            api_key: self.api_key,
            date: self.date,
            dropi_country_suffix: self.country,
            webhook_suffix: self.webhook_suffix,
            date_util: self.until,
            id_workspace: self.workspace,
            flow_ns: None,
        }
    }
}

pub async fn handle_process_command(args: ProcessArgs, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);
    let date = args.date.clone();
    let country = args.country.clone();

    println!(
        "{}",
        format!("Processing orders changed on {} ({})...", date, country).dimmed()
    );

    let result = client.process(&args.into_request()).await?;
    print_run_result(&result);

    Ok(())
}

fn print_run_result(result: &RunResult) {
    if result.total_orders == 0 {
        println!("{}", "No orders found.".yellow());
        return;
    }

    println!("{}", "Run summary:".bold());
    println!("  {} {}", "Orders:".bold(), result.total_orders);
    println!("  {} {}", "Processed:".bold(), result.orders_processed);
    println!("  {} {}", "Skipped:".bold(), result.orders_skipped);
    println!("  {} {}", "Changes:".bold(), result.changes_detected);
    println!("  {} {}", "Webhooks queued:".bold(), result.webhooks_queued);

    if result.webhooks_pending > 0 {
        println!(
            "  {} {}",
            "Webhooks pending:".bold(),
            result.webhooks_pending.to_string().yellow()
        );
    }

    let changed: Vec<_> = result.details.iter().filter(|d| d.changed).collect();
    if !changed.is_empty() {
        println!();
        println!("{}", "Changed orders:".bold());
        for detail in changed {
            let previous = if detail.previous_state.is_empty() {
                "(new)".dimmed().to_string()
            } else {
                detail.previous_state.clone()
            };
            println!(
                "  {} {} → {}",
                detail.order_id.cyan(),
                previous,
                detail.current_state.green()
            );
            if !detail.product_names.is_empty() {
                println!("    {}", detail.product_names.join(", ").dimmed());
            }
        }
    }

    if !result.failed_webhooks.is_empty() {
        println!();
        println!(
            "{}",
            format!("Failed webhooks ({}):", result.failed_webhooks.len())
                .red()
                .bold()
        );
        for failed in &result.failed_webhooks {
            println!(
                "  {} {} {}",
                failed.order_id.cyan(),
                failed.status,
                failed.error.red()
            );
        }
    }

    if result.partial_timeout {
        println!();
        println!(
            "{}",
            "⚠ Run hit its deadline; results are partial".yellow()
        );
    }
}
