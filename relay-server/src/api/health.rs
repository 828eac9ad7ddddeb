//! Health Check API Handler

use axum::{Json, extract::State};
use serde::Serialize;

use crate::api::AppState;

pub const SERVICE_NAME: &str = "order-status-relay";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Upstream circuit breaker state
    pub upstream_circuit: &'static str,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        upstream_circuit: state.breaker.state().as_str(),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{AcceptingSender, serve};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_reports_service_and_circuit() {
        let base = serve(Vec::new(), None, Arc::new(AcceptingSender::default())).await;

        let response = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "order-status-relay");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["upstream_circuit"], "closed");
    }
}
