//! Offset pagination over the order gateway

use std::sync::Arc;

use relay_client::{OrderGateway, PageRequest, UpstreamError};
use relay_core::CallContext;
use relay_core::domain::order::Order;
use tracing::{debug, info, warn};

/// Pagination limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub page_size: i64,
    /// Hard cap on pages per run
    pub max_pages: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 150,
            max_pages: 10,
        }
    }
}

/// What to fetch; shared by every page of one run
#[derive(Debug, Clone, Default)]
pub struct FetchQuery {
    pub api_key: String,
    pub date: String,
    pub country_suffix: String,
    pub until: Option<String>,
}

pub struct Paginator {
    gateway: Arc<dyn OrderGateway>,
    config: PaginationConfig,
}

impl Paginator {
    pub fn new(gateway: Arc<dyn OrderGateway>, config: PaginationConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Fetches every page of changed orders, oldest page first
    ///
    /// Stops on a short page, at the page cap, on a 404 or when the deadline
    /// fires, returning what was accumulated. An error on the first page is
    /// returned as is. Later errors are logged and end pagination early,
    /// except authentication errors, which are returned from any page.
    pub async fn fetch_all(
        &self,
        ctx: &CallContext,
        query: &FetchQuery,
    ) -> Result<Vec<Order>, UpstreamError> {
        let page_size = self.config.page_size.max(1);
        let mut orders: Vec<Order> = Vec::new();

        for page in 0..self.config.max_pages {
            if ctx.deadline().is_done() {
                warn!(page, fetched = orders.len(), "Deadline reached during pagination");
                return Ok(orders);
            }

            let request = PageRequest {
                api_key: query.api_key.clone(),
                date: query.date.clone(),
                country_suffix: query.country_suffix.clone(),
                until: query.until.clone(),
                page_size,
                offset: orders.len(),
            };

            let fetched = tokio::select! {
                result = self.gateway.fetch_page(ctx, &request) => result,
                _ = ctx.deadline().done() => {
                    warn!(page, fetched = orders.len(), "Deadline reached while fetching page");
                    return Ok(orders);
                }
            };

            match fetched {
                Ok(batch) => {
                    let received = batch.len();
                    orders.extend(batch);
                    debug!(page, received, total = orders.len(), "Fetched page");

                    if (received as i64) < page_size {
                        return Ok(orders);
                    }
                }
                Err(e) if e.is_not_found() => {
                    info!(page, total = orders.len(), "No more orders upstream");
                    return Ok(orders);
                }
                Err(e) if page == 0 || e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(
                        page,
                        total = orders.len(),
                        error = %e,
                        "Page fetch failed, continuing with partial results"
                    );
                    return Ok(orders);
                }
            }
        }

        warn!(
            max_pages = self.config.max_pages,
            total = orders.len(),
            "Page cap reached, remaining orders not fetched"
        );
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedGateway, changed_orders};
    use relay_core::Deadline;

    fn paginator(gateway: &Arc<ScriptedGateway>) -> Paginator {
        Paginator::new(gateway.clone(), PaginationConfig::default())
    }

    fn query() -> FetchQuery {
        FetchQuery {
            api_key: "key".to_string(),
            date: "2025-11-18".to_string(),
            country_suffix: "co".to_string(),
            until: None,
        }
    }

    fn ctx() -> CallContext {
        CallContext::new("trace-1")
    }

    fn server_error() -> UpstreamError {
        UpstreamError::ServerError {
            status: 500,
            message: "boom".to_string(),
        }
    }

    fn unauthorized() -> UpstreamError {
        UpstreamError::Unauthorized {
            status: 401,
            message: "bad key".to_string(),
        }
    }

    #[tokio::test]
    async fn test_stops_on_short_page() {
        let gateway = Arc::new(ScriptedGateway::with_page_sizes(&[150, 150, 37]));

        let orders = paginator(&gateway).fetch_all(&ctx(), &query()).await.unwrap();

        assert_eq!(orders.len(), 337);
        assert_eq!(gateway.calls(), 3);
        assert_eq!(gateway.offsets(), vec![0, 150, 300]);
    }

    #[tokio::test]
    async fn test_stops_at_page_cap() {
        let gateway = Arc::new(ScriptedGateway::with_page_sizes(&[150; 12]));

        let orders = paginator(&gateway).fetch_all(&ctx(), &query()).await.unwrap();

        assert_eq!(orders.len(), 1500);
        assert_eq!(gateway.calls(), 10);
    }

    #[tokio::test]
    async fn test_first_page_error_propagates() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Err(server_error())]));

        let error = paginator(&gateway).fetch_all(&ctx(), &query()).await.unwrap_err();

        assert!(matches!(error, UpstreamError::ServerError { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_later_page_error_keeps_partial_results() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(changed_orders(1, 150)),
            Err(server_error()),
        ]));

        let orders = paginator(&gateway).fetch_all(&ctx(), &query()).await.unwrap();

        assert_eq!(orders.len(), 150);
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_auth_error_on_later_page_is_fatal() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(changed_orders(1, 150)),
            Err(unauthorized()),
        ]));

        let error = paginator(&gateway).fetch_all(&ctx(), &query()).await.unwrap_err();

        assert!(error.is_auth());
    }

    #[tokio::test]
    async fn test_not_found_ends_pagination() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Err(UpstreamError::NotFound)]));
        let orders = paginator(&gateway).fetch_all(&ctx(), &query()).await.unwrap();
        assert!(orders.is_empty());

        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(changed_orders(1, 150)),
            Err(UpstreamError::NotFound),
        ]));
        let orders = paginator(&gateway).fetch_all(&ctx(), &query()).await.unwrap();
        assert_eq!(orders.len(), 150);
    }

    #[tokio::test]
    async fn test_expired_deadline_returns_accumulation() {
        let gateway = Arc::new(ScriptedGateway::with_page_sizes(&[150, 150]));
        let deadline = Deadline::none();
        deadline.cancel();
        let ctx = ctx().with_deadline(deadline);

        let orders = paginator(&gateway).fetch_all(&ctx, &query()).await.unwrap();

        assert!(orders.is_empty());
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_page_size_is_forwarded() {
        let gateway = Arc::new(ScriptedGateway::with_page_sizes(&[3]));
        let paginator = Paginator::new(
            gateway.clone(),
            PaginationConfig {
                page_size: 5,
                max_pages: 10,
            },
        );

        let orders = paginator.fetch_all(&ctx(), &query()).await.unwrap();

        assert_eq!(orders.len(), 3);
        assert_eq!(gateway.calls(), 1);
    }
}
