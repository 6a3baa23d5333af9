//! 状态机
//!
//! 迁移策略可配置：
//!
//! - `Permissive`（默认）：任意状态之间都可以设置，方便人工纠错
//! - `Strict`：沿规范路径不回退；Cancelled 可从任意非终态进入；
//!   终态不可再变；订单 / 代购只接受订单词汇
//!
//! 运单每次迁移追加一个检查点事件（同状态调用也追加）。

use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Shipment, ShipmentEvent};
use shared::status::{Status, progress};
use sqlx::SqliteConnection;
use std::str::FromStr;

use crate::db::repository::shipment;

/// 迁移校验策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

impl TransitionPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransitionPolicy::Permissive => "permissive",
            TransitionPolicy::Strict => "strict",
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "strict" => Ok(TransitionPolicy::Strict),
            other => Err(format!("unknown transition policy: {}", other)),
        }
    }
}

/// 状态所属实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Order,
    Procurement,
    Shipment,
}

impl EntityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Order => "order",
            EntityKind::Procurement => "procurement",
            EntityKind::Shipment => "shipment",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次运单迁移的结果
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentTransition {
    pub from: Status,
    pub shipment: Shipment,
    pub event: ShipmentEvent,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StateMachine {
    policy: TransitionPolicy,
}

impl StateMachine {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// 校验迁移是否被当前策略允许
    pub fn check(&self, entity: EntityKind, from: Status, to: Status) -> AppResult<()> {
        match self.policy {
            TransitionPolicy::Permissive => Ok(()),
            TransitionPolicy::Strict => check_strict(entity, from, to),
        }
    }

    /// 设置运单状态并追加检查点
    pub async fn apply_to_shipment(
        &self,
        conn: &mut SqliteConnection,
        mut current: Shipment,
        to: Status,
        location: Option<&str>,
        note: Option<&str>,
    ) -> crate::utils::ServiceResult<ShipmentTransition> {
        let from = current.status;
        self.check(EntityKind::Shipment, from, to)?;

        let now = shared::util::now_millis();
        shipment::update_status(conn, current.id, to, now).await?;
        let event = shipment::insert_event(conn, current.id, to, location, note, now).await?;

        tracing::debug!(
            shipment_id = current.id,
            from = %from,
            to = %to,
            "Shipment transition applied"
        );
        current.status = to;
        current.updated_at = now;
        Ok(ShipmentTransition {
            from,
            shipment: current,
            event,
        })
    }
}

fn check_strict(entity: EntityKind, from: Status, to: Status) -> AppResult<()> {
    if from == to {
        return Ok(());
    }
    let reject = |reason: &str| {
        Err(AppError::with_message(
            ErrorCode::TransitionRejected,
            format!("{} cannot move from {} to {}: {}", entity, from, to, reason),
        )
        .with_detail("from", from.as_str())
        .with_detail("to", to.as_str()))
    };

    if entity != EntityKind::Shipment && !to.is_order_status() {
        return reject("not an order status");
    }
    if from.is_terminal() {
        return reject("current status is final");
    }
    if to == Status::Cancelled {
        return Ok(());
    }
    if progress(to) < progress(from) {
        return reject("status would move backwards");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_allows_backwards() {
        let machine = StateMachine::new(TransitionPolicy::Permissive);
        assert!(machine.check(EntityKind::Order, Status::Completed, Status::Pending).is_ok());
        assert!(machine.check(EntityKind::Shipment, Status::Delivered, Status::Received).is_ok());
    }

    #[test]
    fn test_strict_forward_along_shipment_flow() {
        let machine = StateMachine::new(TransitionPolicy::Strict);
        for pair in Status::SHIPMENT_FLOW.windows(2) {
            assert!(machine.check(EntityKind::Shipment, pair[0], pair[1]).is_ok());
        }
        // 同步运单从订单状态继续推进
        assert!(machine.check(EntityKind::Shipment, Status::Processing, Status::InTransit).is_ok());
    }

    #[test]
    fn test_strict_rejects_backwards_and_final() {
        let machine = StateMachine::new(TransitionPolicy::Strict);
        let err = machine
            .check(EntityKind::Shipment, Status::Arrived, Status::InTransit)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TransitionRejected);
        assert!(machine.check(EntityKind::Order, Status::Completed, Status::Cancelled).is_err());
        assert!(machine.check(EntityKind::Order, Status::Cancelled, Status::Pending).is_err());
        assert!(machine.check(EntityKind::Order, Status::Completed, Status::Completed).is_ok());
    }

    #[test]
    fn test_strict_cancel_from_any_open_state() {
        let machine = StateMachine::new(TransitionPolicy::Strict);
        assert!(machine.check(EntityKind::Order, Status::Shipped, Status::Cancelled).is_ok());
        assert!(machine.check(EntityKind::Shipment, Status::OutForDelivery, Status::Cancelled).is_ok());
    }

    #[test]
    fn test_strict_orders_use_order_vocabulary() {
        let machine = StateMachine::new(TransitionPolicy::Strict);
        assert!(machine.check(EntityKind::Order, Status::Pending, Status::InTransit).is_err());
        assert!(machine.check(EntityKind::Procurement, Status::Pending, Status::Processing).is_ok());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("STRICT".parse::<TransitionPolicy>(), Ok(TransitionPolicy::Strict));
        assert_eq!(" permissive".parse::<TransitionPolicy>(), Ok(TransitionPolicy::Permissive));
        assert!("lenient".parse::<TransitionPolicy>().is_err());
    }
}
