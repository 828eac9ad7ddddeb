//! Run result domain types
//!
//! Aggregate returned by one pipeline invocation and rendered as the body of
//! a successful `/process` response.

use serde::{Deserialize, Serialize};

use super::transition::TransitionResult;

/// Result of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub total_orders: usize,
    /// Orders the loop examined before finishing or hitting the deadline
    pub orders_processed: usize,
    pub changes_detected: usize,
    pub webhooks_queued: usize,
    /// Deliveries interrupted by the run deadline
    pub webhooks_pending: usize,
    pub orders_skipped: usize,
    /// One record per detected order, in upstream order
    pub details: Vec<OrderStatus>,
    /// Failed deliveries, in completion order
    #[serde(default)]
    pub failed_webhooks: Vec<FailedWebhook>,
    #[serde(default)]
    pub partial_timeout: bool,
    /// Diagnostic notes for logs, never sent to clients
    #[serde(skip)]
    pub errors: Vec<String>,
}

/// Per-order detail record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order_id: String,
    pub product_names: Vec<String>,
    pub previous_state: String,
    pub current_state: String,
    pub changed: bool,
}

impl From<&TransitionResult> for OrderStatus {
    fn from(transition: &TransitionResult) -> Self {
        Self {
            order_id: transition.order_id.to_string(),
            product_names: transition.product_names.clone(),
            previous_state: transition.previous_status.clone(),
            current_state: transition.new_status.clone(),
            changed: transition.changed,
        }
    }
}

/// A webhook that could not be delivered during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedWebhook {
    pub order_id: String,
    pub product_names: Vec<String>,
    pub status: String,
    pub webhook_url: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_not_serialized() {
        let result = RunResult {
            total_orders: 2,
            errors: vec!["Order 7: empty history".to_string()],
            ..RunResult::default()
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("errors").is_none());
        assert_eq!(json["total_orders"], 2);
        assert_eq!(json["partial_timeout"], false);
        assert!(json["failed_webhooks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_detail_from_transition() {
        let transition = TransitionResult {
            changed: true,
            previous_status: "PENDIENTE".to_string(),
            new_status: "ENTREGADO".to_string(),
            order_id: 12,
            product_names: vec!["Lamp".to_string()],
            history_len: 4,
        };

        let detail = OrderStatus::from(&transition);
        assert_eq!(detail.order_id, "12");
        assert_eq!(detail.previous_state, "PENDIENTE");
        assert_eq!(detail.current_state, "ENTREGADO");
        assert!(detail.changed);
    }
}
