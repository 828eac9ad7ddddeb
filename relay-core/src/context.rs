//! Request-scoped call context
//!
//! Every pipeline operation receives a [`CallContext`] by reference. It carries
//! the metadata attached to log lines (trace id, workspace, flow namespace) and
//! the [`Deadline`] that governs the whole run.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Cancellation signal for one run
///
/// A deadline fires either when its instant elapses or when [`Deadline::cancel`]
/// is called, whichever happens first. Clones share the same signal.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Option<Instant>,
    cancelled: Arc<watch::Sender<bool>>,
}

impl Deadline {
    /// A deadline that only fires on explicit cancellation
    pub fn none() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            at: None,
            cancelled: Arc::new(tx),
        }
    }

    /// A deadline that fires `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    /// A deadline that fires at `instant`
    pub fn at(instant: Instant) -> Self {
        Self {
            at: Some(instant),
            ..Self::none()
        }
    }

    /// Fires the deadline immediately for every clone
    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    /// Non-blocking poll
    pub fn is_done(&self) -> bool {
        *self.cancelled.borrow() || self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Resolves once the deadline has fired
    pub async fn done(&self) {
        let mut rx = self.cancelled.subscribe();
        let cancelled = async move {
            // The sender lives as long as `self`, so this only errors if it was dropped.
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        match self.at {
            Some(at) => {
                tokio::select! {
                    _ = sleep_until(at) => {}
                    _ = cancelled => {}
                }
            }
            None => cancelled.await,
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

/// Metadata threaded through one pipeline invocation
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Trace identifier propagated from the incoming request
    pub trace_id: String,
    /// Caller workspace, logged when present
    pub id_workspace: Option<String>,
    /// Caller flow namespace, logged when present
    pub flow_ns: Option<String>,
    deadline: Deadline,
}

impl CallContext {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            ..Self::default()
        }
    }

    pub fn with_workspace(mut self, id_workspace: Option<String>) -> Self {
        self.id_workspace = id_workspace.filter(|w| !w.is_empty());
        self
    }

    pub fn with_flow_ns(mut self, flow_ns: Option<String>) -> Self {
        self.flow_ns = flow_ns.filter(|f| !f.is_empty());
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Span carrying the context fields, entered for the duration of a run
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "run",
            trace_id = %self.trace_id,
            id_workspace = self.id_workspace.as_deref().unwrap_or(""),
            flow_ns = self.flow_ns.as_deref().unwrap_or(""),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_deadline_is_not_done() {
        let deadline = Deadline::none();
        assert!(!deadline.is_done());
        assert_eq!(deadline.remaining(), None);
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let deadline = Deadline::none();
        let clone = deadline.clone();
        clone.cancel();
        assert!(deadline.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let deadline = Deadline::after(Duration::from_secs(5));
        assert!(!deadline.is_done());

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(deadline.is_done());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_resolves_on_cancel() {
        let deadline = Deadline::after(Duration::from_secs(3600));
        let waiter = deadline.clone();
        let handle = tokio::spawn(async move { waiter.done().await });

        deadline.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("done() should resolve after cancel")
            .unwrap();
    }

    #[test]
    fn test_empty_metadata_is_dropped() {
        let ctx = CallContext::new("trace-1")
            .with_workspace(Some(String::new()))
            .with_flow_ns(Some("flows.orders".to_string()));

        assert_eq!(ctx.trace_id, "trace-1");
        assert_eq!(ctx.id_workspace, None);
        assert_eq!(ctx.flow_ns.as_deref(), Some("flows.orders"));
    }
}
