//! API Module
//!
//! HTTP API layer for the relay.

pub mod error;
pub mod health;
pub mod process;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use relay_client::{CircuitBreaker, UpstreamClient, WebhookClient};
use relay_pipeline::Pipeline;
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Upstream breaker, shared by every run for the process lifetime
    pub breaker: Arc<CircuitBreaker>,
    pub run_timeout: Duration,
}

impl AppState {
    /// Wires the HTTP clients, breaker and pipeline described by `config`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let breaker = Arc::new(CircuitBreaker::new(
            config.dropi_base_url.clone(),
            config.breaker.clone(),
        ));

        let upstream_http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .context("Failed to build upstream HTTP client")?;
        let webhook_http = reqwest::Client::builder()
            .timeout(config.webhook_timeout)
            .build()
            .context("Failed to build webhook HTTP client")?;

        let upstream = UpstreamClient::with_client(
            config.dropi_base_url.clone(),
            upstream_http,
            Arc::clone(&breaker),
        );
        let webhooks = WebhookClient::with_client(config.webhook_base_url.clone(), webhook_http);

        let pipeline = Pipeline::new(
            Arc::new(upstream),
            Arc::new(webhooks),
            config.pipeline_config(),
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            breaker,
            run_timeout: config.run_timeout,
        })
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/process", post(process::process_orders))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_client::{
        BreakerConfig, OrderGateway, PageRequest, UpstreamError, WebhookError, WebhookSender,
    };
    use relay_core::CallContext;
    use relay_core::domain::order::{HistoryEntry, Order};
    use relay_core::dto::webhook::WebhookPayload;
    use relay_pipeline::PipelineConfig;
    use std::sync::Mutex;

    /// Gateway answering every page with the same canned result
    pub struct CannedGateway {
        pub orders: Vec<Order>,
        pub error: Mutex<Option<UpstreamError>>,
    }

    #[async_trait]
    impl OrderGateway for CannedGateway {
        async fn fetch_page(
            &self,
            _ctx: &CallContext,
            _req: &PageRequest,
        ) -> relay_client::Result<Vec<Order>> {
            match self.error.lock().unwrap().take() {
                Some(error) => Err(error),
                None => Ok(self.orders.clone()),
            }
        }
    }

    #[derive(Default)]
    pub struct AcceptingSender {
        pub trace_ids: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WebhookSender for AcceptingSender {
        fn webhook_url(&self, suffix: &str) -> Result<String, WebhookError> {
            Ok(format!("https://hooks.test/{suffix}"))
        }

        async fn send(
            &self,
            ctx: &CallContext,
            _url: &str,
            _payload: &WebhookPayload,
            _attempt: u32,
        ) -> Result<(), WebhookError> {
            self.trace_ids.lock().unwrap().push(ctx.trace_id.clone());
            Ok(())
        }
    }

    pub fn order(id: i64, statuses: &[&str]) -> Order {
        Order {
            id,
            history: statuses.iter().map(|s| HistoryEntry::new(*s)).collect(),
            ..Order::default()
        }
    }

    /// Serves the router on an ephemeral port, returning its base URL
    pub async fn serve(
        orders: Vec<Order>,
        error: Option<UpstreamError>,
        sender: Arc<AcceptingSender>,
    ) -> String {
        let gateway = CannedGateway {
            orders,
            error: Mutex::new(error),
        };
        let state = AppState {
            pipeline: Arc::new(Pipeline::new(
                Arc::new(gateway),
                sender,
                PipelineConfig::default(),
            )),
            breaker: Arc::new(CircuitBreaker::new("https://api.dropi", BreakerConfig::default())),
            run_timeout: Duration::from_secs(5),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, create_router(state)).await.unwrap() });

        format!("http://{addr}")
    }

    #[test]
    fn test_state_from_config() {
        let state = AppState::from_config(&Config::default()).unwrap();

        assert_eq!(state.run_timeout, Duration::from_secs(180));
        assert_eq!(state.breaker.target(), "https://api.dropi");
        assert_eq!(state.breaker.config().failure_threshold, 5);
    }
}
