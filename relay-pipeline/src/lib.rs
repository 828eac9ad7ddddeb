//! Order Status Relay Pipeline
//!
//! Fetches changed orders page by page, detects status transitions and
//! delivers a webhook per change, all under one run deadline.
//!
//! - [`paginator`]: offset pagination over an [`relay_client::OrderGateway`]
//! - [`detector`]: last-two-entries transition detection
//! - [`retry`]: jittered exponential backoff bounded by the deadline
//! - [`scheduler`]: bounded-concurrency webhook delivery
//! - [`orchestrator`]: the run state machine tying the above together

pub mod detector;
pub mod orchestrator;
pub mod paginator;
pub mod retry;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use detector::{Detect, DetectError, StatusTransitionDetector, detect_transition};
pub use orchestrator::{Pipeline, PipelineConfig, PipelineError, RunRequest};
pub use paginator::{FetchQuery, PaginationConfig, Paginator};
pub use retry::{Backoff, RetryError};
pub use scheduler::{DeliveryDispatcher, DeliveryReport, DispatchConfig};
