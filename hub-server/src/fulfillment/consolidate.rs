//! 合并发货
//!
//! 把客户在仓库中的多件物品合成一条新运单。全部合格才执行，
//! 任何一件不合格则整体失败且没有任何写入。

use std::collections::HashSet;

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{ConsolidationItem, ItemType, Shipment, User};
use shared::status::Status;
use sqlx::SqliteConnection;

use crate::db::repository::{order, procurement, shipment};
use crate::utils::ServiceResult;

/// 不合格原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    NotFound,
    NotOwner,
    /// 已取消 / 已完成
    Closed,
    /// 已有运单号或已被合并
    AlreadyAssigned,
    NotReceived,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ineligible {
    #[serde(flatten)]
    pub item: ConsolidationItem,
    pub reason: IneligibleReason,
}

/// 仓库阶段的统一视图
struct WarehouseState {
    owner_user_id: Option<i64>,
    status: Status,
    tracking_id: Option<String>,
    received_at: Option<i64>,
    consolidated_shipment_id: Option<i64>,
}

impl WarehouseState {
    fn check(&self, customer_id: i64) -> Option<IneligibleReason> {
        if self.owner_user_id != Some(customer_id) {
            Some(IneligibleReason::NotOwner)
        } else if matches!(self.status, Status::Cancelled | Status::Completed) {
            Some(IneligibleReason::Closed)
        } else if self.consolidated_shipment_id.is_some() || self.tracking_id.is_some() {
            Some(IneligibleReason::AlreadyAssigned)
        } else if self.received_at.is_none() {
            Some(IneligibleReason::NotReceived)
        } else {
            None
        }
    }
}

async fn load_state(conn: &mut SqliteConnection, item: ConsolidationItem) -> Result<Option<WarehouseState>, sqlx::Error> {
    Ok(match item.item_type {
        ItemType::Shop => order::find_by_id(conn, item.item_id).await?.map(|o| WarehouseState {
            owner_user_id: o.owner_user_id,
            status: o.status,
            tracking_id: o.tracking_id,
            received_at: o.received_at,
            consolidated_shipment_id: o.consolidated_shipment_id,
        }),
        ItemType::Procurement => procurement::find_by_id(conn, item.item_id).await?.map(|p| WarehouseState {
            owner_user_id: Some(p.owner_user_id),
            status: p.status,
            tracking_id: p.tracking_id,
            received_at: p.received_at,
            consolidated_shipment_id: p.consolidated_shipment_id,
        }),
    })
}

/// 合并结果
#[derive(Debug, Clone, Serialize)]
pub struct Consolidation {
    pub shipment: Shipment,
    pub items: Vec<ConsolidationItem>,
}

#[derive(Debug, Clone)]
pub struct ConsolidationBuilder {
    origin: String,
    destination: String,
}

impl ConsolidationBuilder {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }

    /// 在调用方事务内执行；返回 Err 时调用方回滚
    pub async fn build(
        &self,
        conn: &mut SqliteConnection,
        customer: &User,
        items: &[ConsolidationItem],
    ) -> ServiceResult<Consolidation> {
        if items.is_empty() {
            return Err(AppError::validation("No items selected for consolidation").into());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = items.iter().find(|i| !seen.insert(**i)) {
            return Err(AppError::validation(format!(
                "{} item {} listed more than once",
                dup.item_type, dup.item_id
            ))
            .into());
        }

        // 1. 资格检查（无写入）
        let mut failures = Vec::new();
        for item in items {
            let reason = match load_state(conn, *item).await? {
                None => Some(IneligibleReason::NotFound),
                Some(state) => state.check(customer.id),
            };
            if let Some(reason) = reason {
                failures.push(Ineligible { item: *item, reason });
            }
        }
        if !failures.is_empty() {
            return Err(ineligible_error(&failures).into());
        }

        // 2. 新运单
        let created = self.insert_shipment(conn, customer, items.len()).await?;

        // 3. 消耗物品；并发合并抢先占用时整体回滚
        let now = shared::util::now_millis();
        for item in items {
            let changed = match item.item_type {
                ItemType::Shop => order::assign_consolidation(conn, item.item_id, created.id, now).await?,
                ItemType::Procurement => {
                    procurement::assign_consolidation(conn, item.item_id, created.id, now).await?
                }
            };
            if changed == 0 {
                return Err(ineligible_error(&[Ineligible {
                    item: *item,
                    reason: IneligibleReason::AlreadyAssigned,
                }])
                .into());
            }
        }

        tracing::info!(
            shipment_id = created.id,
            tracking_id = %created.tracking_id,
            customer_id = customer.id,
            items = items.len(),
            "Items consolidated"
        );
        Ok(Consolidation {
            shipment: created,
            items: items.to_vec(),
        })
    }

    async fn insert_shipment(
        &self,
        conn: &mut SqliteConnection,
        customer: &User,
        item_count: usize,
    ) -> ServiceResult<Shipment> {
        let new = shipment::NewShipment {
            tracking_id: String::new(),
            customer_id: Some(customer.id),
            shipper_name: format!("Consolidated ({} items)", item_count),
            recipient_name: customer.name.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            status: Status::Received,
            source: None,
        };
        shipment::insert_with_generated_id(conn, &new)
            .await?
            .ok_or_else(|| tracking_id_exhausted().into())
    }
}

pub(crate) fn tracking_id_exhausted() -> AppError {
    AppError::internal("Could not allocate a unique tracking id")
}

fn ineligible_error(failures: &[Ineligible]) -> AppError {
    let summary: Vec<String> = failures
        .iter()
        .map(|f| format!("{} {}: {:?}", f.item.item_type, f.item.item_id, f.reason))
        .collect();
    AppError::with_message(
        ErrorCode::ConsolidationIneligible,
        format!("Items not eligible for consolidation ({})", summary.join(", ")),
    )
    .with_detail("items", serde_json::to_value(failures).unwrap_or_default())
}
