//! Pipeline orchestrator
//!
//! One run moves through four phases, never revisiting one:
//!
//! ```text
//! fetching → iterating → draining → done
//! ```
//!
//! Only `fetching` can fail the run. Detection errors skip the order,
//! delivery errors are recorded, and the deadline sets `partial_timeout`.

use std::sync::Arc;

use relay_client::{OrderGateway, UpstreamError, WebhookSender};
use relay_core::CallContext;
use relay_core::domain::order::Order;
use relay_core::domain::run::{OrderStatus, RunResult};
use thiserror::Error;
use tracing::{Instrument, debug, info, warn};

use crate::detector::{Detect, StatusTransitionDetector};
use crate::paginator::{FetchQuery, PaginationConfig, Paginator};
use crate::scheduler::{DeliveryDispatcher, DispatchConfig};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to fetch orders: {0}")]
    Fetch(#[from] UpstreamError),
}

/// Input of one run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub api_key: String,
    pub date: String,
    pub country_suffix: String,
    pub webhook_suffix: String,
    pub until: Option<String>,
}

impl RunRequest {
    fn query(&self) -> FetchQuery {
        FetchQuery {
            api_key: self.api_key.clone(),
            date: self.date.clone(),
            country_suffix: self.country_suffix.clone(),
            until: self.until.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    pub pagination: PaginationConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fetching,
    Iterating,
    Draining,
    Done,
}

/// Fetch, detect and deliver, once per call to [`Pipeline::run`]
///
/// Holds no per-run state, so one instance serves concurrent runs.
pub struct Pipeline {
    paginator: Paginator,
    sender: Arc<dyn WebhookSender>,
    detector: Arc<dyn Detect>,
    dispatch: DispatchConfig,
}

impl Pipeline {
    pub fn new(
        gateway: Arc<dyn OrderGateway>,
        sender: Arc<dyn WebhookSender>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            paginator: Paginator::new(gateway, config.pagination),
            sender,
            detector: Arc::new(StatusTransitionDetector),
            dispatch: config.dispatch,
        }
    }

    /// Replaces the transition detector
    pub fn with_detector(mut self, detector: Arc<dyn Detect>) -> Self {
        self.detector = detector;
        self
    }

    /// Executes one run under the deadline carried by `ctx`
    pub async fn run(&self, ctx: &CallContext, req: &RunRequest) -> Result<RunResult, PipelineError> {
        self.run_phases(ctx, req).instrument(ctx.span()).await
    }

    async fn run_phases(&self, ctx: &CallContext, req: &RunRequest) -> Result<RunResult, PipelineError> {
        let webhook_url = self
            .sender
            .webhook_url(&req.webhook_suffix)
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;

        enter(Phase::Fetching);
        let orders = self.paginator.fetch_all(ctx, &req.query()).await?;

        let mut result = RunResult {
            total_orders: orders.len(),
            ..RunResult::default()
        };

        if orders.is_empty() {
            if ctx.deadline().is_done() {
                let note = "processing cancelled after 0 orders: timeout".to_string();
                warn!("{}", note);
                result.errors.push(note);
                result.partial_timeout = true;
            } else {
                info!(date = %req.date, country = %req.country_suffix, "No orders to process");
            }
            enter(Phase::Done);
            return Ok(result);
        }

        enter(Phase::Iterating);
        let mut dispatcher = DeliveryDispatcher::new(Arc::clone(&self.sender), self.dispatch, orders.len());
        self.iterate(ctx, &orders, &webhook_url, &mut dispatcher, &mut result);

        enter(Phase::Draining);
        let report = dispatcher.finish().await;
        result.webhooks_pending = report.interrupted;
        for failure in report.failed {
            result
                .errors
                .push(format!("Webhook failed for order {}: {}", failure.order_id, failure.error));
            result.failed_webhooks.push(failure);
        }

        enter(Phase::Done);
        for note in &result.errors {
            debug!("{}", note);
        }
        info!(
            total_orders = result.total_orders,
            orders_processed = result.orders_processed,
            changes_detected = result.changes_detected,
            webhooks_queued = result.webhooks_queued,
            webhooks_delivered = report.delivered,
            webhooks_failed = result.failed_webhooks.len(),
            webhooks_pending = result.webhooks_pending,
            orders_skipped = result.orders_skipped,
            partial_timeout = result.partial_timeout,
            "Run completed"
        );

        Ok(result)
    }

    fn iterate(
        &self,
        ctx: &CallContext,
        orders: &[Order],
        webhook_url: &str,
        dispatcher: &mut DeliveryDispatcher,
        result: &mut RunResult,
    ) {
        for (index, order) in orders.iter().enumerate() {
            if ctx.deadline().is_done() {
                let note = format!("processing cancelled after {index} orders: timeout");
                warn!(processed = index, total = orders.len(), "{}", note);
                result.errors.push(note);
                result.partial_timeout = true;
                return;
            }

            result.orders_processed += 1;

            let transition = match self.detector.detect(order) {
                Ok(transition) => transition,
                Err(e) => {
                    warn!(order_id = order.id, error = %e, "Skipping order");
                    result.orders_skipped += 1;
                    result.errors.push(format!("Order {}: {}", order.id, e));
                    continue;
                }
            };

            result.details.push(OrderStatus::from(&transition));

            if transition.changed {
                result.changes_detected += 1;
                if dispatcher.dispatch(ctx, order, &transition, webhook_url) {
                    result.webhooks_queued += 1;
                }
            }
        }
    }
}

fn enter(phase: Phase) {
    debug!(phase = ?phase, "Pipeline phase");
}
