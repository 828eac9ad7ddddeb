//! Upstream orders gateway
//!
//! Fetches one page of orders changed on a date from the upstream orders API.
//! Every call goes through the shared [`CircuitBreaker`]; responses are
//! classified into [`UpstreamError`]. This gateway never retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::CallContext;
use relay_core::domain::order::{Order, OrderPage};
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, warn};

use crate::breaker::CircuitBreaker;
use crate::error::{Result, UpstreamError};

/// Path appended to the country-specific host
pub const ORDERS_PATH: &str = "/integrations/orders/myorders";

/// Pre-encoded `filter_date_by` value; spaces must travel as `%20`, not `+`
pub const FILTER_DATE_BY: &str = "FECHA%20DE%20CAMBIO%20DE%20ESTATUS";

/// Header carrying the caller's integration key
pub const API_KEY_HEADER: &str = "dropi-integration-key";

const USER_AGENT: &str = concat!("order-status-relay/", env!("CARGO_PKG_VERSION"));

/// Placeholder that may appear in the base URL instead of a trailing suffix
const COUNTRY_PLACEHOLDER: &str = "{country}";

/// Parameters for one page request
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub api_key: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Country host suffix, e.g. `co` or `com.py`
    pub country_suffix: String,
    /// Optional upper bound, `YYYY-MM-DD`
    pub until: Option<String>,
    /// Orders per page, non-positive values mean 1
    pub page_size: i64,
    /// Orders already fetched by previous pages
    pub offset: usize,
}

/// Source of order pages
///
/// Implemented over HTTP by [`UpstreamClient`]; tests substitute fakes.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Fetches one page of orders
    ///
    /// # Arguments
    /// * `ctx` - Call context of the current run
    /// * `req` - Page parameters
    async fn fetch_page(&self, ctx: &CallContext, req: &PageRequest) -> Result<Vec<Order>>;
}

/// HTTP implementation of [`OrderGateway`]
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    /// Base URL, either `https://api.host` (suffix appended after a dot) or
    /// containing a `{country}` placeholder
    base_url: String,
    client: Client,
    breaker: Arc<CircuitBreaker>,
}

impl UpstreamClient {
    /// Creates a gateway with a default HTTP client
    pub fn new(base_url: impl Into<String>, breaker: Arc<CircuitBreaker>) -> Self {
        Self::with_client(base_url, Client::new(), breaker)
    }

    /// Creates a gateway with a configured reqwest client (timeouts, proxies)
    pub fn with_client(
        base_url: impl Into<String>,
        client: Client,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            breaker,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Builds the full request URL for a page, including the query string
    pub fn page_url(&self, req: &PageRequest) -> Result<String> {
        validate_country_suffix(&req.country_suffix)?;

        let host = if self.base_url.contains(COUNTRY_PLACEHOLDER) {
            self.base_url.replace(COUNTRY_PLACEHOLDER, &req.country_suffix)
        } else {
            format!("{}.{}", self.base_url, req.country_suffix)
        };

        let page_size = if req.page_size <= 0 { 1 } else { req.page_size };

        let mut query = format!(
            "from={}&result_number={}&filter_date_by={}",
            encode_component(&req.date),
            page_size,
            FILTER_DATE_BY
        );
        if let Some(until) = req.until.as_deref().filter(|u| !u.is_empty()) {
            query.push_str("&until=");
            query.push_str(&encode_component(until));
        }
        if req.offset > 0 {
            query.push_str(&format!("&start={}", req.offset));
        }

        Ok(format!("{host}{ORDERS_PATH}?{query}"))
    }

    async fn send(&self, url: &str, api_key: &str) -> Result<Vec<Order>> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.bytes().await?;

        if let Some(error) =
            UpstreamError::classify(status, String::from_utf8_lossy(&body), retry_after)
        {
            return Err(error);
        }

        decode_orders(&body)
    }
}

#[async_trait]
impl OrderGateway for UpstreamClient {
    async fn fetch_page(&self, ctx: &CallContext, req: &PageRequest) -> Result<Vec<Order>> {
        if req.api_key.is_empty() {
            return Err(UpstreamError::InvalidRequest("api_key is required".into()));
        }
        if req.date.is_empty() {
            return Err(UpstreamError::InvalidRequest("date is required".into()));
        }

        let url = self.page_url(req)?;

        let permit = self
            .breaker
            .try_acquire()
            .map_err(|_| UpstreamError::BreakerOpen {
                target: self.breaker.target().to_string(),
            })?;

        debug!(
            trace_id = %ctx.trace_id,
            url = %url,
            offset = req.offset,
            "Fetching orders page"
        );

        let outcome = self.send(&url, &req.api_key).await;

        match &outcome {
            Ok(orders) => {
                permit.success();
                debug!(trace_id = %ctx.trace_id, count = orders.len(), "Orders page received");
            }
            Err(e) if e.counts_against_breaker() => {
                permit.failure();
                warn!(trace_id = %ctx.trace_id, error = %e, "Upstream call failed");
            }
            Err(e) => {
                permit.success();
                debug!(trace_id = %ctx.trace_id, error = %e, "Upstream rejected request");
            }
        }

        outcome
    }
}

/// Decodes a page body; accepts the `{objects: [...]}` envelope or a bare array
pub fn decode_orders(body: &[u8]) -> Result<Vec<Order>> {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<Order>>(trimmed)
            .map_err(|e| UpstreamError::Decode(e.to_string()));
    }

    serde_json::from_str::<OrderPage>(trimmed)
        .map(|page| page.objects)
        .map_err(|e| UpstreamError::Decode(e.to_string()))
}

fn validate_country_suffix(suffix: &str) -> Result<()> {
    let well_formed = suffix.len() >= 2
        && suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '.')
        && !suffix.starts_with('.')
        && !suffix.ends_with('.')
        && !suffix.contains("..");

    if well_formed {
        Ok(())
    } else {
        Err(UpstreamError::InvalidRequest(format!(
            "malformed country suffix '{suffix}'"
        )))
    }
}

/// Percent-encodes a query component, leaving only unreserved characters
fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
