//! 运单同步
//!
//! 订单 / 代购一旦拿到运单号，保证恰好存在一条对应的运单：
//!
//! 1. 按 tracking_id 查找，存在则原样返回
//! 2. 不存在则创建（发货人名取首个商品名，起止点取默认线路）
//! 3. 并发同步撞上唯一约束时重新读取胜出方的行，不向上抛错
//! 4. 已有运单属于另一位客户时报 `TrackingIdConflict`，不做任何写入
//!
//! 通知由调用方负责。

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{ItemType, Order, ProcurementRequest, Shipment};
use shared::status::Status;
use sqlx::SqliteConnection;

use crate::db::{self, repository::shipment};
use crate::utils::ServiceResult;

/// 同步来源
#[derive(Debug, Clone)]
pub struct SyncSource {
    pub item_type: ItemType,
    pub item_id: i64,
    pub tracking_id: String,
    pub owner_user_id: Option<i64>,
    pub recipient_name: String,
    pub item_names: Vec<String>,
    pub status: Status,
}

impl SyncSource {
    /// 没有运单号时返回 None
    pub fn from_order(order: &Order) -> Option<Self> {
        let tracking_id = order.tracking_id.clone()?;
        Some(Self {
            item_type: ItemType::Shop,
            item_id: order.id,
            tracking_id,
            owner_user_id: order.owner_user_id,
            recipient_name: order.customer_name.clone(),
            item_names: order.items.iter().map(|i| i.name.clone()).collect(),
            status: order.status,
        })
    }

    /// 代购的收件人取所属用户名
    pub fn from_procurement(request: &ProcurementRequest, owner_name: &str) -> Option<Self> {
        let tracking_id = request.tracking_id.clone()?;
        Some(Self {
            item_type: ItemType::Procurement,
            item_id: request.id,
            tracking_id,
            owner_user_id: Some(request.owner_user_id),
            recipient_name: owner_name.to_string(),
            item_names: vec![request.item_name.clone()],
            status: request.status,
        })
    }
}

/// 同步结果
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub shipment: Shipment,
    /// 本次调用新建
    pub created: bool,
}

/// `"A"` / `"A + N others"`
pub fn shipper_name(item_names: &[String]) -> String {
    match item_names {
        [] => "MQM Shipment".to_string(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{} + {} others", first, rest.len()),
    }
}

#[derive(Debug, Clone)]
pub struct SyncEngine {
    origin: String,
    destination: String,
}

impl SyncEngine {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// 确保 tracking_id 对应的运单存在
    pub async fn ensure_shipment(
        &self,
        conn: &mut SqliteConnection,
        source: &SyncSource,
    ) -> ServiceResult<SyncOutcome> {
        let outcome = match shipment::find_by_tracking_id(conn, &source.tracking_id).await? {
            Some(existing) => SyncOutcome {
                shipment: existing,
                created: false,
            },
            None => self.materialize(conn, source).await?,
        };
        if !outcome.created {
            check_owner(&outcome.shipment, source)?;
        }
        Ok(outcome)
    }

    /// 直接插入；唯一约束冲突时重新读取
    pub async fn materialize(
        &self,
        conn: &mut SqliteConnection,
        source: &SyncSource,
    ) -> ServiceResult<SyncOutcome> {
        let new = shipment::NewShipment {
            tracking_id: source.tracking_id.clone(),
            customer_id: source.owner_user_id,
            shipper_name: shipper_name(&source.item_names),
            recipient_name: source.recipient_name.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            status: source.status.for_synced_shipment(),
            source: Some((source.item_type, source.item_id)),
        };

        match shipment::insert(conn, &new).await {
            Ok(created) => {
                tracing::info!(
                    tracking_id = %created.tracking_id,
                    source = %source.item_type,
                    source_id = source.item_id,
                    "Shipment synced"
                );
                Ok(SyncOutcome {
                    shipment: created,
                    created: true,
                })
            }
            Err(e) if db::is_unique_violation(&e) => {
                tracing::debug!(tracking_id = %source.tracking_id, "Lost sync race, re-reading winner");
                match shipment::find_by_tracking_id(conn, &source.tracking_id).await? {
                    Some(winner) => Ok(SyncOutcome {
                        shipment: winner,
                        created: false,
                    }),
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// 无主运单可以被任何来源认领；有主运单只接受同一客户
fn check_owner(existing: &Shipment, source: &SyncSource) -> Result<(), AppError> {
    match existing.customer_id {
        Some(owner) if source.owner_user_id != Some(owner) => {
            tracing::warn!(
                tracking_id = %existing.tracking_id,
                owner,
                source = %source.item_type,
                source_id = source.item_id,
                "Tracking id belongs to another customer"
            );
            Err(AppError::with_message(
                ErrorCode::TrackingIdConflict,
                format!("Tracking ID {} belongs to another customer's shipment", existing.tracking_id),
            )
            .with_detail("tracking_id", existing.tracking_id.as_str()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::db::repository::user;
    use shared::models::UserRole;

    fn engine() -> SyncEngine {
        SyncEngine::new("MQM Warehouse - Guangzhou", "MQM Branch - Accra")
    }

    fn source(tracking_id: &str, names: &[&str], status: Status) -> SyncSource {
        SyncSource {
            item_type: ItemType::Shop,
            item_id: 1,
            tracking_id: tracking_id.to_string(),
            owner_user_id: None,
            recipient_name: "Ama Mensah".to_string(),
            item_names: names.iter().map(|s| s.to_string()).collect(),
            status,
        }
    }

    #[test]
    fn test_shipper_name() {
        assert_eq!(shipper_name(&["Sneakers".to_string()]), "Sneakers");
        assert_eq!(
            shipper_name(&["Sneakers".to_string(), "Cap".to_string(), "Belt".to_string()]),
            "Sneakers + 2 others"
        );
        assert_eq!(shipper_name(&[]), "MQM Shipment");
    }

    #[tokio::test]
    async fn test_repeated_sync_is_idempotent() {
        let pool = crate::db::open_pool(&Config::for_tests()).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let src = source("TRK-000555", &["Sneakers", "Cap"], Status::Pending);

        let first = engine().ensure_shipment(&mut conn, &src).await.unwrap();
        let second = engine().ensure_shipment(&mut conn, &src).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.shipment.id, second.shipment.id);
        assert_eq!(first.shipment.status, Status::Processing);
        assert_eq!(first.shipment.shipper_name, "Sneakers + 1 others");
        assert_eq!(first.shipment.origin, "MQM Warehouse - Guangzhou");
        assert_eq!(first.shipment.destination, "MQM Branch - Accra");
        assert_eq!(shipment::count(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_other_customers_tracking_id_is_refused() {
        let pool = crate::db::open_pool(&Config::for_tests()).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let ama = user::insert(&mut conn, "Ama", None, UserRole::Customer).await.unwrap();
        let kofi = user::insert(&mut conn, "Kofi", None, UserRole::Customer).await.unwrap();

        let mut first = source("TRK-000888", &["Lamp"], Status::Pending);
        first.owner_user_id = Some(ama.id);
        let owned = engine().ensure_shipment(&mut conn, &first).await.unwrap();
        assert_eq!(owned.shipment.customer_id, Some(ama.id));

        let mut second = source("TRK-000888", &["Rug"], Status::Cancelled);
        second.item_id = 2;
        second.owner_user_id = Some(kofi.id);
        let err = engine().ensure_shipment(&mut conn, &second).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TrackingIdConflict));

        // 游客订单同样不能认领
        let guest = source("TRK-000888", &["Rug"], Status::Pending);
        assert!(engine().ensure_shipment(&mut conn, &guest).await.is_err());

        // 无主运单任何来源都可以认领
        let unowned = engine()
            .ensure_shipment(&mut conn, &source("TRK-000999", &["Box"], Status::Pending))
            .await
            .unwrap();
        assert_eq!(unowned.shipment.customer_id, None);
        let claimed = engine().ensure_shipment(&mut conn, &owned_by("TRK-000999", kofi.id)).await.unwrap();
        assert_eq!(claimed.shipment.id, unowned.shipment.id);
    }

    fn owned_by(tracking_id: &str, owner: i64) -> SyncSource {
        SyncSource {
            owner_user_id: Some(owner),
            ..source(tracking_id, &["Box"], Status::Pending)
        }
    }

    #[tokio::test]
    async fn test_unique_violation_rereads_winner() {
        let pool = crate::db::open_pool(&Config::for_tests()).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let winner = engine()
            .materialize(&mut conn, &source("TRK-000777", &["Lamp"], Status::Shipped))
            .await
            .unwrap();

        // 直接插入，跳过查找，模拟并发同步
        let loser = engine()
            .materialize(&mut conn, &source("TRK-000777", &["Other"], Status::Pending))
            .await
            .unwrap();

        assert!(!loser.created);
        assert_eq!(loser.shipment.id, winner.shipment.id);
        assert_eq!(loser.shipment.shipper_name, "Lamp");
        assert_eq!(shipment::count(&mut conn).await.unwrap(), 1);
    }
}
