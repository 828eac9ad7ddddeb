//! Webhook payload DTO
//!
//! Flattened order record posted to the webhook endpoint. Every field is
//! always present; optional values serialize as `null`.

use serde::{Deserialize, Serialize};

use crate::domain::order::{Order, OrderDetail, ShopInfo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub id: i64,
    pub status: String,
    pub supplier_id: i64,
    pub dir: String,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub total_order: String,
    pub notes: Option<String>,
    pub name: String,
    pub surname: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub zip_code: Option<String>,
    pub rate_type: String,
    pub shipping_company: String,
    pub shipping_guide: String,
    pub sticker: String,
    pub seller_id: Option<i64>,
    pub shop_order_id: String,
    pub shop_id: i64,
    pub shop_order_number: i64,
    pub warehouse_id: i64,
    pub dni_type: Option<String>,
    pub dni: Option<String>,
    pub colonia: Option<String>,
    pub external_id: Option<String>,
    pub shop: WebhookShop,
    pub novedad_servientrega: Option<String>,
    #[serde(rename = "orderdetails")]
    pub order_details: Vec<WebhookOrderDetail>,
    pub warehouse: WebhookWarehouse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookShop {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub shop_type: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
    pub shop_password: Option<String>,
    pub change_status_pendiente: bool,
    pub status_pendiente: Option<String>,
    pub sync_shipping_guide: bool,
    pub type_id: i64,
    pub webhook: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookWarehouse {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookOrderDetail {
    pub id: i64,
    pub order_id: i64,
    pub price: String,
    pub product: WebhookProduct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookProduct {
    pub id: i64,
    pub id_lista: i64,
    pub name: String,
    pub name_in_order: String,
}

impl From<&Order> for WebhookPayload {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            status: order.status.clone(),
            supplier_id: order.supplier_id,
            dir: order.dir.clone(),
            phone: order.phone.clone(),
            email: order.email.clone(),
            created_at: order.created_at.clone(),
            order_type: order.order_type.clone(),
            total_order: order.total_order.clone(),
            notes: order.notes.clone(),
            name: order.name.clone(),
            surname: order.surname.clone(),
            country: order.country.clone(),
            state: order.state.clone(),
            city: order.city.clone(),
            zip_code: order.zip_code.clone(),
            rate_type: order.rate_type.clone(),
            shipping_company: order.shipping_company.clone(),
            shipping_guide: order.shipping_guide.clone(),
            sticker: order.sticker.clone().unwrap_or_default(),
            seller_id: order.seller_id,
            shop_order_id: order.shop_order_id.clone(),
            shop_id: order.shop_id,
            shop_order_number: order.shop_order_number,
            warehouse_id: order.warehouse_id,
            dni_type: order.dni_type.clone(),
            dni: order.dni.clone(),
            colonia: order.colonia.clone(),
            external_id: order.external_id.clone(),
            shop: WebhookShop::from(&order.shop),
            novedad_servientrega: order.novedad_servientrega.clone(),
            order_details: order.order_details.iter().map(WebhookOrderDetail::from).collect(),
            warehouse: WebhookWarehouse {
                id: order.warehouse.id,
                name: order.warehouse.name.clone(),
            },
        }
    }
}

impl From<&ShopInfo> for WebhookShop {
    fn from(shop: &ShopInfo) -> Self {
        Self {
            id: shop.id,
            user_id: shop.user_id,
            name: shop.name.clone(),
            email: shop.email.clone(),
            phone: shop.phone.clone(),
            shop_type: shop.shop_type.clone(),
            created_at: shop.created_at.clone().unwrap_or_default(),
            updated_at: shop.updated_at.clone().unwrap_or_default(),
            deleted_at: shop.deleted_at.clone(),
            shop_password: shop.shop_password.clone(),
            change_status_pendiente: shop.change_pending.unwrap_or_default(),
            status_pendiente: shop.pending_status.clone(),
            sync_shipping_guide: shop.sync_guide.unwrap_or_default(),
            type_id: shop.type_id.unwrap_or_default(),
            webhook: shop.webhook.clone(),
        }
    }
}

impl From<&OrderDetail> for WebhookOrderDetail {
    fn from(detail: &OrderDetail) -> Self {
        Self {
            id: detail.id,
            order_id: detail.order_id,
            price: detail.price.clone(),
            product: WebhookProduct {
                id: detail.product.id,
                id_lista: detail.product.id_lista,
                name: detail.product.name.clone(),
                name_in_order: detail.product.name_in_order.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::HistoryEntry;

    #[test]
    fn test_payload_shape_is_stable() {
        let order = Order {
            id: 55,
            status: "ENTREGADO".to_string(),
            history: vec![HistoryEntry::new("ENTREGADO")],
            ..Order::default()
        };

        let json = serde_json::to_value(WebhookPayload::from(&order)).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 33);
        assert_eq!(json["id"], 55);
        assert_eq!(json["sticker"], "");
        assert!(json["email"].is_null());
        assert!(json["warehouse"]["id"].is_null());
        assert_eq!(json["shop"]["change_status_pendiente"], false);
        assert!(json["orderdetails"].as_array().unwrap().is_empty());
        assert!(object.get("history").is_none());
    }
}
