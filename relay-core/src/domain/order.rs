//! Order domain types
//!
//! Snapshot of an order as returned by the upstream orders API. Orders are
//! decoded once per run and never mutated afterwards.

use serde::{Deserialize, Serialize};

use super::lenient;

/// One order fetched from upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    #[serde(deserialize_with = "lenient::i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(deserialize_with = "lenient::i64")]
    pub supplier_id: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub dir: String,
    #[serde(deserialize_with = "lenient::string")]
    pub phone: String,
    #[serde(rename = "client_email", deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub created_at: String,
    #[serde(rename = "type", deserialize_with = "lenient::string")]
    pub order_type: String,
    #[serde(deserialize_with = "lenient::string")]
    pub total_order: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub notes: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub surname: String,
    #[serde(deserialize_with = "lenient::string")]
    pub country: String,
    #[serde(deserialize_with = "lenient::string")]
    pub state: String,
    #[serde(deserialize_with = "lenient::string")]
    pub city: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub zip_code: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub rate_type: String,
    #[serde(deserialize_with = "lenient::string")]
    pub shipping_company: String,
    #[serde(deserialize_with = "lenient::string")]
    pub shipping_guide: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub sticker: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub seller_id: Option<i64>,
    #[serde(deserialize_with = "lenient::string")]
    pub shop_order_id: String,
    #[serde(deserialize_with = "lenient::i64")]
    pub shop_id: i64,
    #[serde(deserialize_with = "lenient::i64")]
    pub shop_order_number: i64,
    #[serde(deserialize_with = "lenient::i64")]
    pub warehouse_id: i64,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub dni_type: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub dni: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub colonia: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub external_id: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub shop: ShopInfo,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub novedad_servientrega: Option<String>,
    #[serde(rename = "orderdetails", deserialize_with = "lenient::or_default")]
    pub order_details: Vec<OrderDetail>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub warehouse: WarehouseInfo,
    /// Status history, oldest first, in upstream order
    #[serde(deserialize_with = "lenient::or_default")]
    pub history: Vec<HistoryEntry>,
}

impl Order {
    /// Names of the products in this order, skipping unnamed line items
    pub fn product_names(&self) -> Vec<String> {
        self.order_details
            .iter()
            .map(|detail| detail.product.name.as_str())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// One entry of an order's status history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    #[serde(deserialize_with = "lenient::i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient::i64")]
    pub order_id: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(deserialize_with = "lenient::string")]
    pub created_at: String,
    #[serde(deserialize_with = "lenient::opt_object")]
    pub user: Option<HistoryUser>,
    #[serde(rename = "usuario_chatcenter", deserialize_with = "lenient::opt_object")]
    pub chat_user: Option<ChatUser>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub shipping_guide: Option<String>,
}

impl HistoryEntry {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }
}

/// Upstream user that recorded a history entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryUser {
    #[serde(deserialize_with = "lenient::i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub surname: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub role_user: RoleUser,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleUser {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
}

/// Chat-center operator that recorded a history entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatUser {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopInfo {
    #[serde(deserialize_with = "lenient::i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient::i64")]
    pub user_id: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "lenient::string")]
    pub shop_type: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub updated_at: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub deleted_at: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub shop_password: Option<String>,
    #[serde(rename = "change_status_pendiente", deserialize_with = "lenient::opt_bool")]
    pub change_pending: Option<bool>,
    #[serde(rename = "status_pendiente", deserialize_with = "lenient::opt_string")]
    pub pending_status: Option<String>,
    #[serde(rename = "sync_shipping_guide", deserialize_with = "lenient::opt_bool")]
    pub sync_guide: Option<bool>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub type_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub webhook: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseInfo {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
}

/// Line item of an order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDetail {
    #[serde(deserialize_with = "lenient::i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient::i64")]
    pub order_id: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub price: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub product: Product,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    #[serde(deserialize_with = "lenient::i64")]
    pub id: i64,
    #[serde(deserialize_with = "lenient::i64")]
    pub id_lista: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub name_in_order: String,
}

/// One page of the orders listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPage {
    #[serde(deserialize_with = "lenient::or_default")]
    pub objects: Vec<Order>,
    #[serde(deserialize_with = "lenient::i64")]
    pub count: i64,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub next: Option<String>,
}
