//! Procurement Request Model ("buy for me")

use serde::{Deserialize, Serialize};

use crate::status::Status;

/// Proxy purchase on behalf of a customer. No line-item decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProcurementRequest {
    pub id: i64,
    pub owner_user_id: i64,
    pub item_url: String,
    pub item_name: String,
    pub quantity: i64,
    pub status: Status,
    pub tracking_id: Option<String>,
    pub note: Option<String>,
    pub received_at: Option<i64>,
    pub consolidated_shipment_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create procurement request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementCreate {
    pub item_url: String,
    pub item_name: String,
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Admin update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcurementUpdate {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}
