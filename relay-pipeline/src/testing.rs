//! In-memory gateway and webhook fakes shared by the pipeline tests

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use relay_client::{OrderGateway, PageRequest, UpstreamError, WebhookError, WebhookSender};
use relay_core::CallContext;
use relay_core::domain::order::{HistoryEntry, Order};
use relay_core::dto::webhook::WebhookPayload;

pub fn order(id: i64, statuses: &[&str]) -> Order {
    Order {
        id,
        status: statuses.last().copied().unwrap_or_default().to_string(),
        history: statuses.iter().map(|s| HistoryEntry::new(*s)).collect(),
        ..Order::default()
    }
}

pub fn changed_order(id: i64) -> Order {
    order(id, &["PENDIENTE", "ENTREGADO"])
}

/// `count` changed orders with ids starting at `first_id`
pub fn changed_orders(first_id: i64, count: usize) -> Vec<Order> {
    (0..count as i64).map(|i| changed_order(first_id + i)).collect()
}

/// Gateway that replays a fixed sequence of page results
pub struct ScriptedGateway {
    pages: Mutex<VecDeque<Result<Vec<Order>, UpstreamError>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedGateway {
    pub fn new(pages: Vec<Result<Vec<Order>, UpstreamError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Successful pages of the given sizes, ids unique across pages
    pub fn with_page_sizes(sizes: &[usize]) -> Self {
        let mut next_id = 1;
        let pages = sizes
            .iter()
            .map(|size| {
                let page = changed_orders(next_id, *size);
                next_id += *size as i64;
                Ok(page)
            })
            .collect();
        Self::new(pages)
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.requests.lock().unwrap().iter().map(|r| r.offset).collect()
    }
}

#[async_trait]
impl OrderGateway for ScriptedGateway {
    async fn fetch_page(
        &self,
        _ctx: &CallContext,
        req: &PageRequest,
    ) -> relay_client::Result<Vec<Order>> {
        self.requests.lock().unwrap().push(req.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Webhook sender that records deliveries and in-flight concurrency
#[derive(Default)]
pub struct RecordingSender {
    latency: Duration,
    failing: HashSet<i64>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<i64>>,
}

impl RecordingSender {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Every attempt for these order ids answers 500
    pub fn failing(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.failing = ids.into_iter().collect();
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<i64> {
        let mut ids = self.delivered.lock().unwrap().clone();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl WebhookSender for RecordingSender {
    fn webhook_url(&self, suffix: &str) -> Result<String, WebhookError> {
        Ok(format!("https://hooks.test/{suffix}"))
    }

    async fn send(
        &self,
        _ctx: &CallContext,
        _url: &str,
        payload: &WebhookPayload,
        _attempt: u32,
    ) -> Result<(), WebhookError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&payload.id) {
            return Err(WebhookError::Status { status: 500 });
        }
        self.delivered.lock().unwrap().push(payload.id);
        Ok(())
    }
}
