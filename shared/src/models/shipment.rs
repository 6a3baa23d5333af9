//! Shipment Model

use serde::{Deserialize, Serialize};

use crate::status::{Status, progress};

/// Kind of fulfillment item a shipment can originate from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum ItemType {
    /// Shop order
    Shop,
    /// Procurement request
    Procurement,
}

impl ItemType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ItemType::Shop => "Shop",
            ItemType::Procurement => "Procurement",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer-facing tracked shipment
///
/// `tracking_id` is the unique natural key. `customer_id` is immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Shipment {
    pub id: i64,
    pub tracking_id: String,
    pub customer_id: Option<i64>,
    pub shipper_name: String,
    pub recipient_name: String,
    pub origin: String,
    pub destination: String,
    pub status: Status,
    /// Set when materialized by the sync engine
    pub source_type: Option<ItemType>,
    pub source_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Append-only shipment checkpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShipmentEvent {
    pub id: i64,
    pub shipment_id: i64,
    pub status: Status,
    pub location: Option<String>,
    pub note: Option<String>,
    pub created_at: i64,
}

/// Admin create payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentCreate {
    /// Generated (`TRK-######`) when absent
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    pub shipper_name: String,
    pub recipient_name: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    /// Defaults to `Received`
    #[serde(default)]
    pub status: Option<Status>,
}

/// Admin status update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentStatusUpdate {
    pub status: Status,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Public tracking view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentTracking {
    pub shipment: Shipment,
    /// Oldest first
    pub events: Vec<ShipmentEvent>,
    pub progress: u8,
}

impl ShipmentTracking {
    pub fn new(shipment: Shipment, events: Vec<ShipmentEvent>) -> Self {
        let progress = progress(shipment.status);
        Self {
            shipment,
            events,
            progress,
        }
    }
}

/// One entry of a consolidation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsolidationItem {
    pub item_id: i64,
    pub item_type: ItemType,
}

/// Consolidation request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationRequest {
    pub items: Vec<ConsolidationItem>,
    /// Admins consolidate on behalf of a customer; customers leave it empty
    #[serde(default)]
    pub customer_id: Option<i64>,
}

/// Mark items as received at the origin warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveItemsRequest {
    pub items: Vec<ConsolidationItem>,
}
