//! Customer timeline read model

use serde::{Deserialize, Serialize};

use super::shipment::ItemType;
use crate::status::Status;

/// Which tab of the customer view an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineTab {
    /// Purchased / requested, not yet at the warehouse
    Request,
    /// At the origin warehouse, selectable for consolidation
    Warehouse,
    /// On (or assigned to) an outbound shipment
    Shipment,
}

/// What a timeline row points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineSource {
    Item { item_type: ItemType, item_id: i64 },
    Shipment { shipment_id: i64 },
}

/// One row of the customer timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineItem {
    pub tab: TimelineTab,
    pub source: TimelineSource,
    pub title: String,
    pub status: Status,
    pub tracking_id: Option<String>,
    /// Derived on read, 0..=100
    pub progress: u8,
    pub updated_at: i64,
}
