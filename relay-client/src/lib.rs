//! Relay HTTP Clients
//!
//! Outbound HTTP for the relay pipeline:
//! - [`UpstreamClient`]: fetches pages of changed orders from the upstream
//!   orders API, guarded by a shared [`CircuitBreaker`]
//! - [`WebhookClient`]: posts one order payload to the webhook endpoint
//!
//! Both are exposed behind traits ([`OrderGateway`], [`WebhookSender`]) so the
//! pipeline can be exercised without a network.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use relay_client::{BreakerConfig, CircuitBreaker, OrderGateway, PageRequest, UpstreamClient};
//! use relay_core::CallContext;
//!
//! # async fn example() -> relay_client::Result<()> {
//! let breaker = Arc::new(CircuitBreaker::new("https://api.dropi", BreakerConfig::default()));
//! let upstream = UpstreamClient::new("https://api.dropi", breaker);
//!
//! let orders = upstream
//!     .fetch_page(
//!         &CallContext::new("trace-1"),
//!         &PageRequest {
//!             api_key: "key".into(),
//!             date: "2025-11-18".into(),
//!             country_suffix: "co".into(),
//!             page_size: 150,
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! println!("fetched {} orders", orders.len());
//! # Ok(())
//! # }
//! ```

pub mod breaker;
pub mod error;
mod upstream;
mod webhook;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use error::{Result, UpstreamError, WebhookError};
pub use upstream::{OrderGateway, PageRequest, UpstreamClient, decode_orders};
pub use webhook::{RETRY_ATTEMPT_HEADER, WebhookClient, WebhookSender};
