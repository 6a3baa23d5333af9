//! 履约服务
//!
//! 每个外部动作都是一个工作单元：
//!
//! 1. 权限与参数校验
//! 2. 事务内执行（有界超时，瞬时错误最多重试一次）
//! 3. 提交后写一条审计记录，再通知相关客户
//!
//! 第 3 步的失败只记录日志，不影响返回结果。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CheckoutReceipt, CheckoutRequest, ConsolidationItem, ConsolidationRequest, ItemType, Order, OrderUpdate,
    ProcurementCreate, ProcurementRequest, ProcurementUpdate, ReceiveItemsRequest, Shipment, ShipmentCreate,
    ShipmentStatusUpdate, User, UserCreate, UserRole,
};
use shared::status::Status;
use sqlx::{SqliteConnection, SqlitePool};

use super::consolidate::{Consolidation, ConsolidationBuilder, tracking_id_exhausted};
use super::state_machine::{EntityKind, ShipmentTransition, StateMachine, TransitionPolicy};
use super::sync::{SyncEngine, SyncOutcome, SyncSource};
use crate::audit::{AuditAction, AuditMetadata, AuditPort, AuditRecord};
use crate::auth::{Actor, ActorRole};
use crate::core::Config;
use crate::db::{self, repository::{order, procurement, shipment, user}};
use crate::notify::{NotifyPort, OutboundMessage, compose};
use crate::utils::{ServiceResult, run_primary};

/// 订单 / 代购更新结果
#[derive(Debug, Clone, Serialize)]
pub struct ItemUpdate<T> {
    pub item: T,
    /// 运单号对应的运单（同步后）
    pub shipment: Option<Shipment>,
    /// 本次调用新建了运单
    pub shipment_created: bool,
}

/// 事务内的变更结果
struct ItemChange<T> {
    from: Status,
    item: T,
    synced: Option<SyncOutcome>,
}

/// 本次签收的物品
struct ReceivedItem {
    item: ConsolidationItem,
    owner_user_id: Option<i64>,
    label: String,
}

#[derive(Clone)]
pub struct FulfillmentService {
    pool: SqlitePool,
    audit: Arc<dyn AuditPort>,
    notifier: Arc<dyn NotifyPort>,
    machine: StateMachine,
    sync: SyncEngine,
    consolidation: ConsolidationBuilder,
    timeout: Duration,
    whatsapp_number: Option<String>,
}

impl std::fmt::Debug for FulfillmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulfillmentService")
            .field("policy", &self.machine.policy())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl FulfillmentService {
    pub fn new(
        pool: SqlitePool,
        audit: Arc<dyn AuditPort>,
        notifier: Arc<dyn NotifyPort>,
        config: &Config,
    ) -> Self {
        Self {
            pool,
            audit,
            notifier,
            machine: StateMachine::new(config.transition_policy),
            sync: SyncEngine::new(&config.default_origin, &config.default_destination),
            consolidation: ConsolidationBuilder::new(&config.default_origin, &config.default_destination),
            timeout: config.operation_timeout(),
            whatsapp_number: config.whatsapp_number.clone(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.machine.policy()
    }

    async fn notify(&self, user_id: Option<i64>, message: OutboundMessage) {
        if let Some(user_id) = user_id {
            self.notifier.notify_user(user_id, &message.title, &message.message).await;
        }
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// 注册用户；创建管理员需要管理员身份
    pub async fn register_user(&self, actor: &Actor, payload: UserCreate) -> ServiceResult<User> {
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(AppError::required("name").into());
        }
        if payload.role == UserRole::Admin {
            actor.require_admin()?;
        }
        let phone = payload.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
        let role = payload.role;

        let created = run_primary("register_user", self.timeout, || self.insert_user(name, phone, role)).await?;

        tracing::info!(user_id = created.id, role = ?created.role, "User registered");
        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::UserRegistered,
                    "user",
                    format!("Registered {:?} user {}", created.role, created.name),
                    actor,
                )
                .entity(created.id),
            )
            .await;
        Ok(created)
    }

    async fn insert_user(&self, name: &str, phone: Option<&str>, role: UserRole) -> ServiceResult<User> {
        let mut conn = self.pool.acquire().await?;
        Ok(user::insert(&mut conn, name, phone, role).await?)
    }

    // ========================================================================
    // Checkout / procurement
    // ========================================================================

    /// 下单：生成参考号，写入订单与明细，返回 WhatsApp 交接链接
    pub async fn checkout(&self, actor: &Actor, payload: CheckoutRequest) -> ServiceResult<CheckoutReceipt> {
        let customer_name = payload.customer_name.trim();
        if customer_name.is_empty() {
            return Err(AppError::required("customer_name").into());
        }
        if payload.items.is_empty() {
            return Err(AppError::validation("Order must contain at least one item").into());
        }
        for item in &payload.items {
            if item.name.trim().is_empty() {
                return Err(AppError::required("items.name").into());
            }
            if item.quantity <= 0 {
                return Err(AppError::with_message(
                    ErrorCode::ValueOutOfRange,
                    format!("Quantity for {} must be positive", item.name),
                )
                .into());
            }
            if !item.unit_price.is_finite() || item.unit_price < 0.0 {
                return Err(AppError::with_message(
                    ErrorCode::ValueOutOfRange,
                    format!("Unit price for {} is invalid", item.name),
                )
                .into());
            }
        }

        // 游客下单没有所属用户
        let owner_user_id = match actor.role {
            ActorRole::Customer => actor.id,
            _ => None,
        };
        let phone = payload.customer_phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
        let total: f64 = payload.items.iter().map(|i| i.line_total()).sum();
        let new = order::NewOrder {
            ref_code: "",
            customer_name,
            customer_phone: phone,
            owner_user_id,
            status: Status::Pending,
            total_amount: total,
        };

        let placed = run_primary("checkout", self.timeout, || self.checkout_once(&new, &payload.items)).await?;

        tracing::info!(order_id = placed.id, ref_code = %placed.ref_code, total = placed.total_amount, "Order placed");
        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::OrderCreated,
                    "order",
                    format!("Order {} placed by {}", placed.ref_code, placed.customer_name),
                    actor,
                )
                .entity(placed.id)
                .metadata(AuditMetadata::Checkout {
                    ref_code: placed.ref_code.clone(),
                    total_amount: placed.total_amount,
                    item_count: placed.items.len(),
                }),
            )
            .await;

        let whatsapp_url = self
            .whatsapp_number
            .as_deref()
            .and_then(|number| compose::whatsapp_link(number, &compose::checkout_text(&placed)));
        Ok(CheckoutReceipt {
            order: placed,
            whatsapp_url,
        })
    }

    async fn checkout_once(
        &self,
        template: &order::NewOrder<'_>,
        items: &[shared::models::OrderLineItem],
    ) -> ServiceResult<Order> {
        let mut tx = db::begin_write(&self.pool).await?;
        let now = shared::util::now_millis();

        let mut order_id = None;
        for _ in 0..shared::util::MAX_ID_ATTEMPTS {
            let ref_code = shared::util::generate_ref_code();
            let new = order::NewOrder {
                ref_code: &ref_code,
                ..*template
            };
            match order::insert(&mut tx, &new, now).await {
                Ok(id) => {
                    order_id = Some(id);
                    break;
                }
                Err(e) if db::is_unique_violation(&e) => {
                    tracing::debug!(ref_code = %ref_code, "Ref code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        let order_id = order_id.ok_or_else(|| {
            AppError::with_message(ErrorCode::RefCodeConflict, "Could not allocate a unique order reference")
        })?;

        order::insert_items(&mut tx, order_id, items).await?;
        let placed = order::find_by_id(&mut tx, order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;
        tx.commit().await?;
        Ok(placed)
    }

    /// 代购请求（需要注册用户）
    pub async fn create_procurement(
        &self,
        actor: &Actor,
        payload: ProcurementCreate,
    ) -> ServiceResult<ProcurementRequest> {
        let owner_user_id = actor.require_user_id()?;
        let item_url = payload.item_url.trim();
        let item_name = payload.item_name.trim();
        if item_url.is_empty() {
            return Err(AppError::required("item_url").into());
        }
        if item_name.is_empty() {
            return Err(AppError::required("item_name").into());
        }
        if payload.quantity <= 0 {
            return Err(AppError::with_message(ErrorCode::ValueOutOfRange, "Quantity must be positive").into());
        }
        let note = payload.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let quantity = payload.quantity;

        let created = run_primary("create_procurement", self.timeout, || {
            self.insert_procurement(owner_user_id, item_url, item_name, quantity, note)
        })
        .await?;

        tracing::info!(procurement_id = created.id, owner = owner_user_id, "Procurement request created");
        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::ProcurementCreated,
                    "procurement",
                    format!("Procurement request for {} x {}", created.quantity, created.item_name),
                    actor,
                )
                .entity(created.id),
            )
            .await;
        Ok(created)
    }

    async fn insert_procurement(
        &self,
        owner_user_id: i64,
        item_url: &str,
        item_name: &str,
        quantity: i64,
        note: Option<&str>,
    ) -> ServiceResult<ProcurementRequest> {
        let mut conn = self.pool.acquire().await?;
        if user::find_by_id(&mut conn, owner_user_id).await?.is_none() {
            return Err(user_not_found(owner_user_id).into());
        }
        Ok(procurement::insert(&mut conn, owner_user_id, item_url, item_name, quantity, note).await?)
    }

    // ========================================================================
    // Admin status updates (+ shipment sync)
    // ========================================================================

    /// 管理员修改订单状态 / 运单号；有运单号时同步运单
    pub async fn update_order(&self, actor: &Actor, id: i64, update: OrderUpdate) -> ServiceResult<ItemUpdate<Order>> {
        actor.require_admin()?;
        let tracking_id = normalize_tracking_id(update.tracking_id.as_deref())?;
        if update.status.is_none() && tracking_id.is_none() {
            return Err(AppError::validation("Nothing to update: provide status or tracking_id").into());
        }
        let note = update.note.as_deref().map(str::trim).filter(|n| !n.is_empty());

        let change = run_primary("update_order", self.timeout, || {
            self.update_order_once(id, update.status, tracking_id, note)
        })
        .await?;

        let updated = &change.item;
        let created_shipment = change.synced.as_ref().filter(|s| s.created).map(|s| s.shipment.id);
        tracing::info!(
            order_id = id,
            from = %change.from,
            to = %updated.status,
            tracking_id = ?updated.tracking_id,
            shipment_created = created_shipment.is_some(),
            "Order updated"
        );

        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::OrderUpdated,
                    "order",
                    describe_change(&updated.ref_code, change.from, updated.status, updated.tracking_id.as_deref()),
                    actor,
                )
                .entity(id)
                .metadata(AuditMetadata::StatusChange {
                    from: change.from,
                    to: updated.status,
                    tracking_id: updated.tracking_id.clone(),
                    location: None,
                    synced_shipment_id: created_shipment,
                }),
            )
            .await;
        self.notify(
            updated.owner_user_id,
            compose::order_status(&updated.ref_code, updated.status, updated.tracking_id.as_deref()),
        )
        .await;

        Ok(ItemUpdate {
            shipment_created: created_shipment.is_some(),
            shipment: change.synced.map(|s| s.shipment),
            item: change.item,
        })
    }

    async fn update_order_once(
        &self,
        id: i64,
        status: Option<Status>,
        tracking_id: Option<&str>,
        note: Option<&str>,
    ) -> ServiceResult<ItemChange<Order>> {
        let mut tx = db::begin_write(&self.pool).await?;
        let mut current = order::find_by_id(&mut tx, id).await?.ok_or_else(|| order_not_found(id))?;

        let from = current.status;
        let to = status.unwrap_or(from);
        self.machine.check(EntityKind::Order, from, to)?;
        refuse_new_tracking_id(&current.ref_code, from, current.tracking_id.as_deref(), tracking_id)?;

        let now = shared::util::now_millis();
        let tracking_id = tracking_id.map(str::to_string).or(current.tracking_id.take());
        order::update_fields(&mut tx, id, to, tracking_id.as_deref(), now).await?;
        current.status = to;
        current.tracking_id = tracking_id;
        current.updated_at = now;

        let synced = match SyncSource::from_order(&current) {
            Some(source) => Some(self.sync_and_propagate(&mut tx, &source, from, note).await?),
            None => None,
        };

        tx.commit().await?;
        Ok(ItemChange {
            from,
            item: current,
            synced,
        })
    }

    /// 管理员修改代购状态 / 运单号 / 备注
    pub async fn update_procurement(
        &self,
        actor: &Actor,
        id: i64,
        update: ProcurementUpdate,
    ) -> ServiceResult<ItemUpdate<ProcurementRequest>> {
        actor.require_admin()?;
        let tracking_id = normalize_tracking_id(update.tracking_id.as_deref())?;
        let note = update.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        if update.status.is_none() && tracking_id.is_none() && note.is_none() {
            return Err(AppError::validation("Nothing to update: provide status, tracking_id or note").into());
        }

        let change = run_primary("update_procurement", self.timeout, || {
            self.update_procurement_once(id, update.status, tracking_id, note)
        })
        .await?;

        let updated = &change.item;
        let created_shipment = change.synced.as_ref().filter(|s| s.created).map(|s| s.shipment.id);
        tracing::info!(
            procurement_id = id,
            from = %change.from,
            to = %updated.status,
            shipment_created = created_shipment.is_some(),
            "Procurement request updated"
        );

        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::ProcurementUpdated,
                    "procurement",
                    describe_change(&updated.item_name, change.from, updated.status, updated.tracking_id.as_deref()),
                    actor,
                )
                .entity(id)
                .metadata(AuditMetadata::StatusChange {
                    from: change.from,
                    to: updated.status,
                    tracking_id: updated.tracking_id.clone(),
                    location: None,
                    synced_shipment_id: created_shipment,
                }),
            )
            .await;
        self.notify(
            Some(updated.owner_user_id),
            compose::procurement_status(&updated.item_name, updated.status, updated.tracking_id.as_deref()),
        )
        .await;

        Ok(ItemUpdate {
            shipment_created: created_shipment.is_some(),
            shipment: change.synced.map(|s| s.shipment),
            item: change.item,
        })
    }

    async fn update_procurement_once(
        &self,
        id: i64,
        status: Option<Status>,
        tracking_id: Option<&str>,
        note: Option<&str>,
    ) -> ServiceResult<ItemChange<ProcurementRequest>> {
        let mut tx = db::begin_write(&self.pool).await?;
        let mut current = procurement::find_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| procurement_not_found(id))?;

        let from = current.status;
        let to = status.unwrap_or(from);
        self.machine.check(EntityKind::Procurement, from, to)?;
        refuse_new_tracking_id(&current.item_name, from, current.tracking_id.as_deref(), tracking_id)?;

        let now = shared::util::now_millis();
        let tracking_id = tracking_id.map(str::to_string).or(current.tracking_id.take());
        let note = note.map(str::to_string).or(current.note.take());
        procurement::update_fields(&mut tx, id, to, tracking_id.as_deref(), note.as_deref(), now).await?;
        current.status = to;
        current.tracking_id = tracking_id;
        current.note = note;
        current.updated_at = now;

        let synced = if current.tracking_id.is_some() {
            let owner_name = user::find_by_id(&mut tx, current.owner_user_id)
                .await?
                .map(|u| u.name)
                .unwrap_or_else(|| "Customer".to_string());
            match SyncSource::from_procurement(&current, &owner_name) {
                Some(source) => Some(self.sync_and_propagate(&mut tx, &source, from, None).await?),
                None => None,
            }
        } else {
            None
        };

        tx.commit().await?;
        Ok(ItemChange {
            from,
            item: current,
            synced,
        })
    }

    /// 同步运单；若运单早已存在且本次改了状态，把新状态追加到运单检查点
    async fn sync_and_propagate(
        &self,
        conn: &mut SqliteConnection,
        source: &SyncSource,
        previous: Status,
        note: Option<&str>,
    ) -> ServiceResult<SyncOutcome> {
        let mut outcome = self.sync.ensure_shipment(conn, source).await?;
        if outcome.created || source.status == previous {
            return Ok(outcome);
        }

        let target = source.status.for_synced_shipment();
        let current = outcome.shipment.status;
        if current == target {
            return Ok(outcome);
        }
        if let Err(e) = self.machine.check(EntityKind::Shipment, current, target) {
            tracing::debug!(
                tracking_id = %outcome.shipment.tracking_id,
                reason = %e,
                "Shipment status left unchanged"
            );
            return Ok(outcome);
        }

        let note = note
            .map(str::to_string)
            .unwrap_or_else(|| format!("Updated from {} {}", source.item_type, source.item_id));
        let transition = self
            .machine
            .apply_to_shipment(conn, outcome.shipment, target, None, Some(&note))
            .await?;
        outcome.shipment = transition.shipment;
        Ok(outcome)
    }

    // ========================================================================
    // Warehouse
    // ========================================================================

    /// 仓库签收；已签收的物品跳过，返回本次新签收的物品
    pub async fn mark_received(
        &self,
        actor: &Actor,
        request: ReceiveItemsRequest,
    ) -> ServiceResult<Vec<ConsolidationItem>> {
        actor.require_admin()?;
        if request.items.is_empty() {
            return Err(AppError::validation("No items to receive").into());
        }

        let received = run_primary("mark_received", self.timeout, || self.receive_once(&request.items)).await?;
        if received.is_empty() {
            return Ok(Vec::new());
        }

        let items: Vec<ConsolidationItem> = received.iter().map(|r| r.item).collect();
        tracing::info!(count = items.len(), "Items received at warehouse");
        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::ItemReceived,
                    "warehouse",
                    format!("{} items received at warehouse", items.len()),
                    actor,
                )
                .metadata(AuditMetadata::Received { items: items.clone() }),
            )
            .await;
        for r in &received {
            self.notify(r.owner_user_id, compose::item_received(r.item.item_type, &r.label))
                .await;
        }
        Ok(items)
    }

    async fn receive_once(&self, items: &[ConsolidationItem]) -> ServiceResult<Vec<ReceivedItem>> {
        let mut tx = db::begin_write(&self.pool).await?;
        let now = shared::util::now_millis();
        let mut received = Vec::new();

        for item in items {
            let (owner_user_id, label, already) = match item.item_type {
                ItemType::Shop => {
                    let o = order::find_by_id(&mut tx, item.item_id)
                        .await?
                        .ok_or_else(|| order_not_found(item.item_id))?;
                    (o.owner_user_id, o.ref_code, o.received_at.is_some())
                }
                ItemType::Procurement => {
                    let p = procurement::find_by_id(&mut tx, item.item_id)
                        .await?
                        .ok_or_else(|| procurement_not_found(item.item_id))?;
                    (Some(p.owner_user_id), p.item_name, p.received_at.is_some())
                }
            };
            if already {
                continue;
            }
            let changed = match item.item_type {
                ItemType::Shop => order::mark_received(&mut tx, item.item_id, now).await?,
                ItemType::Procurement => procurement::mark_received(&mut tx, item.item_id, now).await?,
            };
            if changed > 0 {
                received.push(ReceivedItem {
                    item: *item,
                    owner_user_id,
                    label,
                });
            }
        }

        tx.commit().await?;
        Ok(received)
    }

    // ========================================================================
    // Shipments
    // ========================================================================

    /// 管理员手工建运单；运单号缺省时自动生成
    pub async fn create_shipment(&self, actor: &Actor, payload: ShipmentCreate) -> ServiceResult<Shipment> {
        actor.require_admin()?;
        let shipper_name = payload.shipper_name.trim();
        let recipient_name = payload.recipient_name.trim();
        if shipper_name.is_empty() {
            return Err(AppError::required("shipper_name").into());
        }
        if recipient_name.is_empty() {
            return Err(AppError::required("recipient_name").into());
        }
        let tracking_id = normalize_tracking_id(payload.tracking_id.as_deref())?;

        let new = shipment::NewShipment {
            tracking_id: String::new(),
            customer_id: payload.customer_id,
            shipper_name: shipper_name.to_string(),
            recipient_name: recipient_name.to_string(),
            origin: non_empty_or(payload.origin.as_deref(), &self.sync_origin()),
            destination: non_empty_or(payload.destination.as_deref(), &self.sync_destination()),
            status: payload.status.unwrap_or(Status::Received),
            source: None,
        };

        let created = run_primary("create_shipment", self.timeout, || {
            self.create_shipment_once(&new, tracking_id)
        })
        .await?;

        tracing::info!(shipment_id = created.id, tracking_id = %created.tracking_id, "Shipment created");
        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::ShipmentCreated,
                    "shipment",
                    format!("Shipment {} created for {}", created.tracking_id, created.recipient_name),
                    actor,
                )
                .entity(created.id),
            )
            .await;
        self.notify(created.customer_id, compose::shipment_created(&created.tracking_id))
            .await;
        Ok(created)
    }

    async fn create_shipment_once(
        &self,
        template: &shipment::NewShipment,
        tracking_id: Option<&str>,
    ) -> ServiceResult<Shipment> {
        let mut tx = db::begin_write(&self.pool).await?;
        if let Some(customer_id) = template.customer_id
            && user::find_by_id(&mut tx, customer_id).await?.is_none()
        {
            return Err(user_not_found(customer_id).into());
        }

        let created = match tracking_id {
            Some(tracking_id) => {
                let new = shipment::NewShipment {
                    tracking_id: tracking_id.to_string(),
                    ..template.clone()
                };
                match shipment::insert(&mut tx, &new).await {
                    Ok(created) => created,
                    Err(e) if db::is_unique_violation(&e) => {
                        return Err(AppError::with_message(
                            ErrorCode::TrackingIdConflict,
                            format!("Tracking ID {} is already in use", tracking_id),
                        )
                        .with_detail("tracking_id", tracking_id)
                        .into());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            None => shipment::insert_with_generated_id(&mut tx, template)
                .await?
                .ok_or_else(tracking_id_exhausted)?,
        };

        tx.commit().await?;
        Ok(created)
    }

    /// 管理员更新运单状态，追加检查点
    pub async fn update_shipment_status(
        &self,
        actor: &Actor,
        id: i64,
        update: ShipmentStatusUpdate,
    ) -> ServiceResult<ShipmentTransition> {
        actor.require_admin()?;
        let location = update.location.as_deref().map(str::trim).filter(|l| !l.is_empty());
        let note = update.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let status = update.status;

        let transition = run_primary("update_shipment_status", self.timeout, || {
            self.transition_once(id, status, location, note)
        })
        .await?;

        let moved = &transition.shipment;
        tracing::info!(
            shipment_id = id,
            tracking_id = %moved.tracking_id,
            from = %transition.from,
            to = %moved.status,
            location = ?location,
            "Shipment status updated"
        );
        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::ShipmentStatusChanged,
                    "shipment",
                    describe_change(&moved.tracking_id, transition.from, moved.status, None),
                    actor,
                )
                .entity(id)
                .metadata(AuditMetadata::StatusChange {
                    from: transition.from,
                    to: moved.status,
                    tracking_id: Some(moved.tracking_id.clone()),
                    location: location.map(str::to_string),
                    synced_shipment_id: None,
                }),
            )
            .await;
        self.notify(
            moved.customer_id,
            compose::shipment_status(&moved.tracking_id, moved.status, location),
        )
        .await;
        Ok(transition)
    }

    async fn transition_once(
        &self,
        id: i64,
        status: Status,
        location: Option<&str>,
        note: Option<&str>,
    ) -> ServiceResult<ShipmentTransition> {
        let mut tx = db::begin_write(&self.pool).await?;
        let current = shipment::find_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| shipment_not_found(id))?;
        let transition = self
            .machine
            .apply_to_shipment(&mut tx, current, status, location, note)
            .await?;
        tx.commit().await?;
        Ok(transition)
    }

    /// 合并仓库中的物品为一条新运单
    pub async fn consolidate(&self, actor: &Actor, request: ConsolidationRequest) -> ServiceResult<Consolidation> {
        let customer_id = match request.customer_id {
            Some(customer_id) if actor.is_admin() || actor.id == Some(customer_id) => customer_id,
            Some(_) => {
                return Err(AppError::permission_denied("Cannot consolidate another customer's items").into());
            }
            None => actor.require_user_id()?,
        };

        let result = run_primary("consolidate", self.timeout, || {
            self.consolidate_once(customer_id, &request.items)
        })
        .await?;

        let created = &result.shipment;
        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::ShipmentsConsolidated,
                    "shipment",
                    format!("Consolidated {} items into {}", result.items.len(), created.tracking_id),
                    actor,
                )
                .entity(created.id)
                .metadata(AuditMetadata::Consolidation {
                    shipment_id: created.id,
                    tracking_id: created.tracking_id.clone(),
                    items: result.items.clone(),
                }),
            )
            .await;
        self.notify(
            Some(customer_id),
            compose::consolidated(&created.tracking_id, result.items.len()),
        )
        .await;
        Ok(result)
    }

    async fn consolidate_once(&self, customer_id: i64, items: &[ConsolidationItem]) -> ServiceResult<Consolidation> {
        let mut tx = db::begin_write(&self.pool).await?;
        let customer = user::find_by_id(&mut tx, customer_id)
            .await?
            .ok_or_else(|| user_not_found(customer_id))?;
        let result = self.consolidation.build(&mut tx, &customer, items).await?;
        tx.commit().await?;
        Ok(result)
    }

    fn sync_origin(&self) -> String {
        self.sync.origin().to_string()
    }

    fn sync_destination(&self) -> String {
        self.sync.destination().to_string()
    }
}

/// 已完成 / 已取消的条目不再接受新的运单号，宽松策略下同样如此
fn refuse_new_tracking_id(
    label: &str,
    status: Status,
    current: Option<&str>,
    requested: Option<&str>,
) -> Result<(), AppError> {
    let closed = matches!(status, Status::Completed | Status::Cancelled);
    match requested {
        Some(requested) if closed && current != Some(requested) => Err(AppError::with_message(
            ErrorCode::TransitionRejected,
            format!("{} is {} and cannot take a new tracking ID", label, status),
        )
        .with_detail("status", status.to_string())
        .with_detail("tracking_id", requested)),
        _ => Ok(()),
    }
}

/// 空白运单号视为未提供
fn normalize_tracking_id(raw: Option<&str>) -> Result<Option<&str>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) if id.chars().any(char::is_whitespace) => Err(AppError::with_message(
            ErrorCode::InvalidFormat,
            "Tracking ID must not contain whitespace",
        )
        .with_detail("tracking_id", id)),
        Some(id) => Ok(Some(id)),
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn describe_change(label: &str, from: Status, to: Status, tracking_id: Option<&str>) -> String {
    let mut text = if from == to {
        format!("{}: status {} (unchanged)", label, to)
    } else {
        format!("{}: {} -> {}", label, from, to)
    };
    if let Some(tracking_id) = tracking_id {
        text.push_str(&format!(", tracking {}", tracking_id));
    }
    text
}

pub(crate) fn order_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::OrderNotFound, format!("Order {} not found", id))
}

pub(crate) fn procurement_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::ProcurementNotFound, format!("Procurement request {} not found", id))
}

pub(crate) fn shipment_not_found(id: impl std::fmt::Display) -> AppError {
    AppError::with_message(ErrorCode::ShipmentNotFound, format!("Shipment {} not found", id))
}

pub(crate) fn user_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::UserNotFound, format!("User {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tracking_id() {
        assert_eq!(normalize_tracking_id(None).unwrap(), None);
        assert_eq!(normalize_tracking_id(Some("  ")).unwrap(), None);
        assert_eq!(normalize_tracking_id(Some(" TRK-000555 ")).unwrap(), Some("TRK-000555"));
        let err = normalize_tracking_id(Some("TRK 1")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[test]
    fn test_closed_items_keep_their_tracking_id() {
        let err = refuse_new_tracking_id("REF-1234-MQM", Status::Cancelled, None, Some("TRK-000555")).unwrap_err();
        assert_eq!(err.code, ErrorCode::TransitionRejected);
        assert!(refuse_new_tracking_id("REF-1234-MQM", Status::Completed, Some("TRK-1"), Some("TRK-2")).is_err());

        // 重复提交同一个运单号、不带运单号、未关闭的条目都放行
        assert!(refuse_new_tracking_id("REF-1234-MQM", Status::Completed, Some("TRK-1"), Some("TRK-1")).is_ok());
        assert!(refuse_new_tracking_id("REF-1234-MQM", Status::Cancelled, None, None).is_ok());
        assert!(refuse_new_tracking_id("REF-1234-MQM", Status::Shipped, Some("TRK-1"), Some("TRK-2")).is_ok());
    }

    #[test]
    fn test_describe_change() {
        assert_eq!(
            describe_change("REF-1234-MQM", Status::Pending, Status::Processing, Some("TRK-000555")),
            "REF-1234-MQM: Pending -> Processing, tracking TRK-000555"
        );
        assert_eq!(
            describe_change("TRK-1", Status::Arrived, Status::Arrived, None),
            "TRK-1: status Arrived (unchanged)"
        );
    }
}
