//! API client module
//!
//! HTTP client for the relay server API.

use anyhow::{Context, Result};
use relay_core::domain::run::RunResult;
use relay_core::dto::process::ProcessRequest;
use reqwest::Client;
use serde::Deserialize;

/// Body of `GET /health`
#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    #[serde(default)]
    pub upstream_circuit: Option<String>,
}

/// HTTP client for the relay server
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the relay server
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Run the relay for one date and country
    ///
    /// # Arguments
    /// * `req` - The process request
    ///
    /// # Returns
    /// The run summary
    pub async fn process(&self, req: &ProcessRequest) -> Result<RunResult> {
        let url = format!("{}/process", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .context("Failed to send process request")?;

        self.handle_response(response).await
    }

    /// Check server health
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send health request")?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Request failed with status {}: {}",
                status,
                error_message(&error_text)
            );
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }
}

/// Pulls the message out of an `{"error": ...}` body, or returns the body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_json_body() {
        assert_eq!(
            error_message(r#"{"error":"api_key and date are required"}"#),
            "api_key and date are required"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(r#"{"status":"x"}"#), r#"{"status":"x"}"#);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
