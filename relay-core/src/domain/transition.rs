//! Transition domain types

use serde::{Deserialize, Serialize};

/// Outcome of comparing the two most recent history entries of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub changed: bool,
    /// Empty for an order whose history holds a single entry
    pub previous_status: String,
    pub new_status: String,
    pub order_id: i64,
    pub product_names: Vec<String>,
    pub history_len: usize,
}
