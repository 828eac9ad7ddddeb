//! Webhook delivery client
//!
//! Posts one order payload to the configured webhook endpoint. Each call is a
//! single attempt; retrying belongs to the caller.

use async_trait::async_trait;
use relay_core::CallContext;
use relay_core::dto::webhook::WebhookPayload;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::WebhookError;

/// Header carrying the 1-based attempt number
pub const RETRY_ATTEMPT_HEADER: &str = "X-Retry-Attempt";

/// Destination for order payloads
#[async_trait]
pub trait WebhookSender: Send + Sync {
    /// Resolves the full webhook URL for a caller-supplied suffix
    fn webhook_url(&self, suffix: &str) -> Result<String, WebhookError>;

    /// Performs one delivery attempt
    ///
    /// # Arguments
    /// * `ctx` - Call context of the current run
    /// * `url` - URL returned by [`WebhookSender::webhook_url`]
    /// * `payload` - Order record to post
    /// * `attempt` - 1-based attempt number, sent as `X-Retry-Attempt`
    async fn send(
        &self,
        ctx: &CallContext,
        url: &str,
        payload: &WebhookPayload,
        attempt: u32,
    ) -> Result<(), WebhookError>;
}

/// HTTP implementation of [`WebhookSender`]
#[derive(Debug, Clone)]
pub struct WebhookClient {
    base_url: String,
    client: Client,
}

impl WebhookClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WebhookSender for WebhookClient {
    fn webhook_url(&self, suffix: &str) -> Result<String, WebhookError> {
        let suffix = suffix.trim_matches('/');
        if suffix.is_empty() {
            return Err(WebhookError::InvalidUrl(
                "webhook suffix is required".to_string(),
            ));
        }
        Ok(format!("{}/{}", self.base_url, suffix))
    }

    async fn send(
        &self,
        ctx: &CallContext,
        url: &str,
        payload: &WebhookPayload,
        attempt: u32,
    ) -> Result<(), WebhookError> {
        let body = serde_json::to_vec(payload)?;

        debug!(
            trace_id = %ctx.trace_id,
            url = %url,
            order_id = payload.id,
            attempt,
            "Webhook attempt"
        );

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(RETRY_ATTEMPT_HEADER, attempt.to_string())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(WebhookError::Status {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use relay_core::domain::order::Order;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(Option<String>, Option<String>, serde_json::Value)>>>;

    async fn serve(status: StatusCode) -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/hooks/orders",
                post(
                    move |State(seen): State<Seen>,
                          headers: HeaderMap,
                          axum::Json(body): axum::Json<serde_json::Value>| async move {
                        let header = |name: &str| {
                            headers
                                .get(name)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string)
                        };
                        seen.lock().unwrap().push((
                            header("content-type"),
                            header(RETRY_ATTEMPT_HEADER),
                            body,
                        ));
                        status
                    },
                ),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        (format!("http://{addr}"), seen)
    }

    fn payload() -> WebhookPayload {
        let order = Order {
            id: 77,
            status: "ENTREGADO".to_string(),
            ..Order::default()
        };
        WebhookPayload::from(&order)
    }

    #[test]
    fn test_webhook_url_joins_slashes() {
        let client = WebhookClient::new("https://hooks.example.com/");
        assert_eq!(
            client.webhook_url("/orders/status/").unwrap(),
            "https://hooks.example.com/orders/status"
        );
        assert!(client.webhook_url("//").is_err());
    }

    #[tokio::test]
    async fn test_send_posts_json_with_attempt_header() {
        let (base, seen) = serve(StatusCode::OK).await;
        let client = WebhookClient::new(base);
        let url = client.webhook_url("hooks/orders").unwrap();

        client
            .send(&CallContext::new("t"), &url, &payload(), 2)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        let (content_type, attempt, body) = &seen[0];
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(attempt.as_deref(), Some("2"));
        assert_eq!(body["id"], 77);
        assert_eq!(body["status"], "ENTREGADO");
    }

    #[tokio::test]
    async fn test_non_2xx_is_a_failed_attempt() {
        let (base, _) = serve(StatusCode::INTERNAL_SERVER_ERROR).await;
        let client = WebhookClient::new(base);
        let url = client.webhook_url("hooks/orders").unwrap();

        let error = client
            .send(&CallContext::new("t"), &url, &payload(), 1)
            .await
            .unwrap_err();

        assert!(matches!(error, WebhookError::Status { status: 500 }));
        assert_eq!(error.to_string(), "webhook failed with status 500");
    }
}
