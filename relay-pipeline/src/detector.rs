//! Status transition detection
//!
//! Compares the last two entries of an order's status history. Pure, no I/O.

use relay_core::domain::order::Order;
use relay_core::domain::transition::TransitionResult;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectError {
    #[error("empty history")]
    EmptyHistory { order_id: i64 },
}

/// Decides whether an order changed status
pub trait Detect: Send + Sync {
    fn detect(&self, order: &Order) -> Result<TransitionResult, DetectError>;
}

/// Last-two-entries comparison over the order history
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTransitionDetector;

impl Detect for StatusTransitionDetector {
    fn detect(&self, order: &Order) -> Result<TransitionResult, DetectError> {
        detect_transition(order)
    }
}

/// Detects a transition for one order
///
/// - no history: [`DetectError::EmptyHistory`]
/// - one entry: always a change, from `""` to that entry's status
/// - two or more: a change when the last two statuses differ
pub fn detect_transition(order: &Order) -> Result<TransitionResult, DetectError> {
    let (previous_status, new_status) = match order.history.as_slice() {
        [] => return Err(DetectError::EmptyHistory { order_id: order.id }),
        [only] => (String::new(), only.status.clone()),
        [.., previous, last] => (previous.status.clone(), last.status.clone()),
    };

    let changed = order.history.len() == 1 || previous_status != new_status;

    debug!(
        order_id = order.id,
        previous = %previous_status,
        current = %new_status,
        changed,
        "Transition detected"
    );

    Ok(TransitionResult {
        changed,
        previous_status,
        new_status,
        order_id: order.id,
        product_names: order.product_names(),
        history_len: order.history.len(),
    })
}
