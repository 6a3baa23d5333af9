//! Order Model (shop checkout)

use serde::{Deserialize, Serialize};

use crate::status::Status;

/// Order line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLineItem {
    pub name: String,
    pub quantity: i64,
    /// Price in currency unit
    pub unit_price: f64,
    /// Product page the customer picked the item from
    #[serde(default)]
    pub source_url: Option<String>,
}

impl OrderLineItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Order entity
///
/// `owner_user_id` is `None` for guest checkout and never changes once set.
/// `received_at` / `consolidated_shipment_id` track the warehouse stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// `REF-####-MQM`
    pub ref_code: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub owner_user_id: Option<i64>,
    pub status: Status,
    pub tracking_id: Option<String>,
    /// Total in currency unit
    pub total_amount: f64,
    /// Received at the origin warehouse
    pub received_at: Option<i64>,
    /// Consumed by a consolidated shipment
    pub consolidated_shipment_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Loaded separately from `order_items`
    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<OrderLineItem>,
}

/// Checkout payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub items: Vec<OrderLineItem>,
}

/// Checkout result: the stored order plus the messaging hand-off link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub order: Order,
    /// `https://wa.me/...` with the order summary pre-filled
    pub whatsapp_url: Option<String>,
}

/// Admin update payload (status and / or tracking id)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}
