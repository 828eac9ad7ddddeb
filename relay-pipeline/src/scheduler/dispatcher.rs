//! Webhook delivery dispatcher
//!
//! Each changed order gets its own task. Tasks wait on a shared semaphore
//! before their first attempt, retry with backoff, and report exactly one
//! outcome on a channel sized to the number of tasks. [`DeliveryDispatcher::finish`]
//! consumes the dispatcher, joins every task, then drains the channel.

use std::collections::HashMap;
use std::sync::Arc;

use relay_client::WebhookSender;
use relay_core::CallContext;
use relay_core::domain::order::Order;
use relay_core::domain::run::FailedWebhook;
use relay_core::domain::transition::TransitionResult;
use relay_core::dto::webhook::WebhookPayload;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, warn};

use crate::retry::{Backoff, RetryError};

/// Error recorded for deliveries cut short by the run deadline
pub const INTERRUPTED_ERROR: &str = "delivery interrupted: deadline exceeded";

const ABORTED_ERROR: &str = "delivery task aborted";

/// Delivery tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Deliveries allowed in flight at once
    pub concurrency: usize,
    pub backoff: Backoff,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            backoff: Backoff::default(),
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Delivered,
    Failed(String),
    Interrupted,
}

/// Aggregated outcome of every delivery in one run
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Failed and interrupted deliveries, in completion order
    pub failed: Vec<FailedWebhook>,
    /// How many of `failed` were interrupted by the deadline
    pub interrupted: usize,
}

/// Spawns and tracks webhook deliveries for one run
pub struct DeliveryDispatcher {
    sender: Arc<dyn WebhookSender>,
    semaphore: Arc<Semaphore>,
    backoff: Backoff,
    tasks: JoinSet<()>,
    outcomes_tx: mpsc::Sender<(usize, Outcome)>,
    outcomes_rx: mpsc::Receiver<(usize, Outcome)>,
    dispatched: HashMap<usize, FailedWebhook>,
    capacity: usize,
}

impl DeliveryDispatcher {
    /// Creates a dispatcher able to hold up to `capacity` deliveries
    pub fn new(sender: Arc<dyn WebhookSender>, config: DispatchConfig, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (outcomes_tx, outcomes_rx) = mpsc::channel(capacity);

        Self {
            sender,
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            backoff: config.backoff,
            tasks: JoinSet::new(),
            outcomes_tx,
            outcomes_rx,
            dispatched: HashMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.dispatched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatched.is_empty()
    }

    /// Starts delivering `order` to `webhook_url`
    ///
    /// Returns `false` without spawning once `capacity` deliveries exist.
    pub fn dispatch(
        &mut self,
        ctx: &CallContext,
        order: &Order,
        transition: &TransitionResult,
        webhook_url: &str,
    ) -> bool {
        if self.dispatched.len() >= self.capacity {
            warn!(order_id = order.id, capacity = self.capacity, "Dispatcher full, delivery dropped");
            return false;
        }

        let seq = self.dispatched.len();
        self.dispatched.insert(
            seq,
            FailedWebhook {
                order_id: order.id.to_string(),
                product_names: transition.product_names.clone(),
                status: transition.new_status.clone(),
                webhook_url: webhook_url.to_string(),
                error: String::new(),
            },
        );

        let payload = WebhookPayload::from(order);
        let url = webhook_url.to_string();
        let ctx = ctx.clone();
        let sender = Arc::clone(&self.sender);
        let semaphore = Arc::clone(&self.semaphore);
        let backoff = self.backoff;
        let outcomes = self.outcomes_tx.clone();
        let span = tracing::info_span!("delivery", order_id = order.id);

        self.tasks.spawn(
            async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => deliver(&*sender, &ctx, &url, &payload, backoff).await,
                    Err(_) => Outcome::Failed("delivery slots closed".to_string()),
                };

                if outcomes.try_send((seq, outcome)).is_err() {
                    error!("Outcome channel full, delivery result lost");
                }
            }
            .instrument(span),
        );

        true
    }

    /// Waits for every delivery and collects the outcomes
    pub async fn finish(self) -> DeliveryReport {
        let Self {
            mut tasks,
            outcomes_tx,
            mut outcomes_rx,
            mut dispatched,
            ..
        } = self;

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Delivery task panicked: {}", e);
            }
        }
        drop(outcomes_tx);

        let mut report = DeliveryReport::default();
        while let Some((seq, outcome)) = outcomes_rx.recv().await {
            let Some(mut record) = dispatched.remove(&seq) else {
                continue;
            };
            match outcome {
                Outcome::Delivered => report.delivered += 1,
                Outcome::Failed(reason) => {
                    record.error = reason;
                    report.failed.push(record);
                }
                Outcome::Interrupted => {
                    record.error = INTERRUPTED_ERROR.to_string();
                    report.interrupted += 1;
                    report.failed.push(record);
                }
            }
        }

        // Tasks that panicked never reported
        let mut missing: Vec<_> = dispatched.into_iter().collect();
        missing.sort_by_key(|(seq, _)| *seq);
        for (_, mut record) in missing {
            record.error = ABORTED_ERROR.to_string();
            report.failed.push(record);
        }

        report
    }
}

async fn deliver(
    sender: &dyn WebhookSender,
    ctx: &CallContext,
    url: &str,
    payload: &WebhookPayload,
    backoff: Backoff,
) -> Outcome {
    let result = backoff
        .retry(ctx.deadline(), |attempt| sender.send(ctx, url, payload, attempt))
        .await;

    match result {
        Ok(()) => {
            info!(url = %url, "Webhook delivered");
            Outcome::Delivered
        }
        Err(RetryError::Exhausted { attempts, last }) => {
            warn!(url = %url, attempts, error = %last, "Webhook delivery failed");
            Outcome::Failed(last.to_string())
        }
        Err(RetryError::Interrupted { attempts }) => {
            warn!(url = %url, attempts, "Webhook delivery interrupted by deadline");
            Outcome::Interrupted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::detect_transition;
    use crate::testing::{RecordingSender, changed_order};
    use relay_core::Deadline;
    use std::time::Duration;

    const URL: &str = "https://hooks.test/orders";

    fn config(concurrency: usize) -> DispatchConfig {
        DispatchConfig {
            concurrency,
            backoff: Backoff::new(3, Duration::from_millis(1)),
        }
    }

    fn dispatch_all(
        dispatcher: &mut DeliveryDispatcher,
        ctx: &CallContext,
        ids: impl IntoIterator<Item = i64>,
    ) {
        for id in ids {
            let order = changed_order(id);
            let transition = detect_transition(&order).unwrap();
            assert!(dispatcher.dispatch(ctx, &order, &transition, URL));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_width() {
        let sender = Arc::new(RecordingSender::new(Duration::from_millis(10)));
        let mut dispatcher = DeliveryDispatcher::new(sender.clone(), config(5), 50);

        dispatch_all(&mut dispatcher, &CallContext::new("t"), 1..=50);
        let report = dispatcher.finish().await;

        assert_eq!(report.delivered, 50);
        assert!(report.failed.is_empty());
        assert!(sender.max_in_flight() <= 5, "max {}", sender.max_in_flight());
        assert_eq!(sender.delivered(), (1..=50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_order() {
        let sender = Arc::new(RecordingSender::new(Duration::ZERO).failing([7]));
        let mut dispatcher = DeliveryDispatcher::new(sender.clone(), config(5), 10);

        dispatch_all(&mut dispatcher, &CallContext::new("t"), 1..=10);
        let report = dispatcher.finish().await;

        assert_eq!(report.delivered, 9);
        assert_eq!(report.interrupted, 0);
        assert_eq!(report.failed.len(), 1);

        let failure = &report.failed[0];
        assert_eq!(failure.order_id, "7");
        assert_eq!(failure.status, "ENTREGADO");
        assert_eq!(failure.webhook_url, URL);
        assert_eq!(failure.error, "webhook failed with status 500");

        // 9 successes plus 3 attempts for the failing order
        assert_eq!(sender.attempts(), 12);
    }

    #[tokio::test]
    async fn test_expired_deadline_interrupts_deliveries() {
        let sender = Arc::new(RecordingSender::new(Duration::ZERO));
        let deadline = Deadline::none();
        deadline.cancel();
        let ctx = CallContext::new("t").with_deadline(deadline);
        let mut dispatcher = DeliveryDispatcher::new(sender.clone(), config(2), 3);

        dispatch_all(&mut dispatcher, &ctx, 1..=3);
        let report = dispatcher.finish().await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.interrupted, 3);
        assert!(report.failed.iter().all(|f| f.error == INTERRUPTED_ERROR));
        assert_eq!(sender.attempts(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_beyond_capacity_is_refused() {
        let sender = Arc::new(RecordingSender::new(Duration::ZERO));
        let ctx = CallContext::new("t");
        let mut dispatcher = DeliveryDispatcher::new(sender, config(1), 1);

        let order = changed_order(1);
        let transition = detect_transition(&order).unwrap();
        assert!(dispatcher.dispatch(&ctx, &order, &transition, URL));
        assert!(!dispatcher.dispatch(&ctx, &order, &transition, URL));
        assert_eq!(dispatcher.len(), 1);

        assert_eq!(dispatcher.finish().await.delivered, 1);
    }

    #[tokio::test]
    async fn test_finish_without_deliveries_is_empty() {
        let dispatcher =
            DeliveryDispatcher::new(Arc::new(RecordingSender::default()), config(5), 0);

        assert!(dispatcher.is_empty());
        let report = dispatcher.finish().await;

        assert_eq!(report.delivered, 0);
        assert!(report.failed.is_empty());
    }
}
