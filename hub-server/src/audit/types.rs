//! 审计日志类型定义
//!
//! 所有条目不可变、不可删除。`kind` 在写入时由 `action` 一次性确定，
//! 读取端不再做字符串匹配分类。

use serde::{Deserialize, Serialize};
use shared::models::ConsolidationItem;
use shared::status::Status;
use std::str::FromStr;

use crate::auth::Actor;

/// 审计操作类型（枚举，非自由文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ 用户 ═══
    UserRegistered,

    // ═══ 订单 / 代购 ═══
    OrderCreated,
    OrderUpdated,
    ProcurementCreated,
    ProcurementUpdated,
    /// 仓库签收（订单或代购）
    ItemReceived,

    // ═══ 运单 ═══
    ShipmentCreated,
    ShipmentStatusChanged,
    ShipmentsConsolidated,

    // ═══ 通知 ═══
    BroadcastSent,
    NotificationsRead,
}

impl AuditAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegistered => "user_registered",
            AuditAction::OrderCreated => "order_created",
            AuditAction::OrderUpdated => "order_updated",
            AuditAction::ProcurementCreated => "procurement_created",
            AuditAction::ProcurementUpdated => "procurement_updated",
            AuditAction::ItemReceived => "item_received",
            AuditAction::ShipmentCreated => "shipment_created",
            AuditAction::ShipmentStatusChanged => "shipment_status_changed",
            AuditAction::ShipmentsConsolidated => "shipments_consolidated",
            AuditAction::BroadcastSent => "broadcast_sent",
            AuditAction::NotificationsRead => "notifications_read",
        }
    }

    /// 写入时确定的分类
    pub const fn kind(&self) -> ActionKind {
        match self {
            AuditAction::UserRegistered
            | AuditAction::OrderCreated
            | AuditAction::ProcurementCreated
            | AuditAction::ShipmentCreated
            | AuditAction::ShipmentsConsolidated => ActionKind::Create,
            AuditAction::OrderUpdated
            | AuditAction::ProcurementUpdated
            | AuditAction::ItemReceived
            | AuditAction::ShipmentStatusChanged
            | AuditAction::NotificationsRead => ActionKind::Update,
            AuditAction::BroadcastSent => ActionKind::Broadcast,
        }
    }

    pub const ALL: [AuditAction; 11] = [
        AuditAction::UserRegistered,
        AuditAction::OrderCreated,
        AuditAction::OrderUpdated,
        AuditAction::ProcurementCreated,
        AuditAction::ProcurementUpdated,
        AuditAction::ItemReceived,
        AuditAction::ShipmentCreated,
        AuditAction::ShipmentStatusChanged,
        AuditAction::ShipmentsConsolidated,
        AuditAction::BroadcastSent,
        AuditAction::NotificationsRead,
    ];
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown audit action: {}", s))
    }
}

/// 操作分类（展示着色、过滤）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Sync,
    Broadcast,
    System,
}

impl ActionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
            ActionKind::Sync => "sync",
            ActionKind::Broadcast => "broadcast",
            ActionKind::System => "system",
        }
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ActionKind::Create),
            "update" => Ok(ActionKind::Update),
            "delete" => Ok(ActionKind::Delete),
            "sync" => Ok(ActionKind::Sync),
            "broadcast" => Ok(ActionKind::Broadcast),
            "system" => Ok(ActionKind::System),
            other => Err(format!("unknown action kind: {}", other)),
        }
    }
}

/// 结构化附加数据
///
/// 已知形状按 `kind` 标签区分；无法识别的 JSON 原样保存在 `Raw` 中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditMetadata {
    /// 下单
    Checkout {
        ref_code: String,
        total_amount: f64,
        item_count: usize,
    },
    /// 状态 / 运单号变更
    StatusChange {
        from: Status,
        to: Status,
        #[serde(default)]
        tracking_id: Option<String>,
        #[serde(default)]
        location: Option<String>,
        /// 本次同步新建的运单
        #[serde(default)]
        synced_shipment_id: Option<i64>,
    },
    /// 仓库签收
    Received { items: Vec<ConsolidationItem> },
    /// 合并发货
    Consolidation {
        shipment_id: i64,
        tracking_id: String,
        items: Vec<ConsolidationItem>,
    },
    /// 广播
    Broadcast { recipient_count: u64 },
    /// 已读
    Read { count: u64 },
    /// 未识别的载荷
    Raw { payload: serde_json::Value },
}

impl AuditMetadata {
    /// 存储形式：`Raw` 原样写回，其他按标签序列化
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            AuditMetadata::Raw { payload } => Ok(payload.clone()),
            other => serde_json::to_value(other),
        }
    }

    /// 解析存储形式，识别不了的保留为 `Raw`
    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(AuditMetadata::Raw { payload: value })
    }

    pub fn recipient_count(&self) -> Option<u64> {
        match self {
            AuditMetadata::Broadcast { recipient_count } => Some(*recipient_count),
            _ => None,
        }
    }
}

/// 写入请求
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub action: AuditAction,
    /// 资源类型（如 "order", "shipment"）
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub actor: Actor,
    /// 人类可读描述
    pub details: String,
    pub metadata: Option<AuditMetadata>,
    /// 发生时间（Unix 毫秒），构造时取值；入库后即 `created_at`
    pub occurred_at: i64,
}

impl AuditRecord {
    pub fn new(
        action: AuditAction,
        entity_type: impl Into<String>,
        details: impl Into<String>,
        actor: &Actor,
    ) -> Self {
        Self {
            action,
            entity_type: entity_type.into(),
            entity_id: None,
            actor: actor.clone(),
            details: details.into(),
            metadata: None,
            occurred_at: shared::util::now_millis(),
        }
    }

    pub fn entity(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn metadata(mut self, metadata: AuditMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// 审计日志条目（不可变）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: AuditAction,
    pub kind: ActionKind,
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// 操作人 ID（System 为 None）
    pub actor_id: Option<i64>,
    /// 操作人名称（冗余存储）
    pub actor_name: String,
    pub details: String,
    pub metadata: Option<AuditMetadata>,
    /// 操作发生时间（Unix 毫秒），不是写入时间
    pub created_at: i64,
}

pub const DEFAULT_AUDIT_LIMIT: i64 = 50;
pub const MAX_AUDIT_LIMIT: i64 = 500;

/// 审计日志查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub kind: Option<ActionKind>,
    pub action: Option<AuditAction>,
    pub actor_id: Option<i64>,
    /// 起始时间（Unix 毫秒，含）
    pub from: Option<i64>,
    /// 截止时间（Unix 毫秒，含）
    pub to: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    /// 分页大小（默认 50，最大 500）
    #[serde(default)]
    pub limit: Option<i64>,
}

impl AuditQuery {
    pub fn for_entity(entity_type: impl Into<String>, entity_id: impl ToString) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            entity_id: Some(entity_id.to_string()),
            ..Self::default()
        }
    }

    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// 审计日志列表响应
#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub items: Vec<AuditEntry>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_kind_assignment() {
        assert_eq!(AuditAction::OrderCreated.kind(), ActionKind::Create);
        assert_eq!(AuditAction::ShipmentStatusChanged.kind(), ActionKind::Update);
        assert_eq!(AuditAction::BroadcastSent.kind(), ActionKind::Broadcast);
    }

    #[test]
    fn test_action_round_trips_through_str() {
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>(), Ok(action));
        }
        assert!("order_deleted".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_known_metadata_parses_typed() {
        let stored = json!({ "kind": "broadcast", "recipient_count": 3 });
        let meta = AuditMetadata::from_json(stored);
        assert_eq!(meta, AuditMetadata::Broadcast { recipient_count: 3 });
        assert_eq!(meta.recipient_count(), Some(3));
    }

    #[test]
    fn test_unknown_metadata_falls_back_to_raw() {
        let stored = json!({ "kind": "refund_issued", "amount": 12 });
        let meta = AuditMetadata::from_json(stored.clone());
        assert_eq!(meta, AuditMetadata::Raw { payload: stored.clone() });
        assert_eq!(meta.to_json().unwrap(), stored);
    }

    #[test]
    fn test_query_limit_is_clamped() {
        assert_eq!(AuditQuery::default().effective_limit(), 50);
        let q = AuditQuery { limit: Some(10_000), ..Default::default() };
        assert_eq!(q.effective_limit(), 500);
        let q = AuditQuery { limit: Some(0), offset: Some(-3), ..Default::default() };
        assert_eq!(q.effective_limit(), 1);
        assert_eq!(q.effective_offset(), 0);
    }
}
