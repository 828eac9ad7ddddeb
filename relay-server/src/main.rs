//! Order Status Relay
//!
//! HTTP service that, per request, pulls the orders whose status changed on
//! a given date from the upstream orders API, detects which ones actually
//! transitioned, and posts each of those to a webhook.
//!
//! Architecture:
//! - Configuration: environment variables, validated at startup
//! - API: axum router with `/process` and `/health`
//! - Pipeline: fetch, detect and deliver (see `relay-pipeline`)

pub mod api;
pub mod config;
pub mod validation;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::{Config, LogFormat};

const DEFAULT_LOG_FILTER: &str =
    "relay_server=info,relay_pipeline=info,relay_client=info,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(config.log_format);

    info!("Starting Order Status Relay...");

    config.validate().context("Invalid configuration")?;
    info!(
        "Loaded configuration: upstream={}, webhook_base={}, run_timeout={:?}, webhook_concurrency={}",
        config.dropi_base_url,
        config.webhook_base_url,
        config.run_timeout,
        config.webhook_concurrency
    );

    let state = AppState::from_config(&config)?;
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server stopped unexpectedly")?;

    info!("Server exited");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutting down gracefully...");
}
