//! 读模型
//!
//! 列表、客户时间线、公开追踪。进度在读取时计算。

use shared::error::AppError;
use shared::models::{
    ItemType, Order, ProcurementRequest, Shipment, ShipmentTracking, TimelineItem, TimelineSource, TimelineTab, User,
};
use shared::status::progress;

use super::service::{FulfillmentService, shipment_not_found, user_not_found};
use super::sync::shipper_name;
use crate::auth::Actor;
use crate::db::repository::{order, procurement, shipment, user};
use crate::utils::ServiceResult;

impl FulfillmentService {
    /// 管理员查看全部用户
    pub async fn list_users(&self, actor: &Actor) -> ServiceResult<Vec<User>> {
        actor.require_admin()?;
        let mut conn = self.pool().acquire().await?;
        Ok(user::list(&mut conn).await?)
    }

    /// 管理员看全部，客户看自己的
    pub async fn list_orders(&self, actor: &Actor) -> ServiceResult<Vec<Order>> {
        let mut conn = self.pool().acquire().await?;
        if actor.is_admin() {
            Ok(order::list(&mut conn).await?)
        } else {
            let user_id = actor.require_user_id()?;
            Ok(order::list_by_owner(&mut conn, user_id).await?)
        }
    }

    pub async fn list_procurements(&self, actor: &Actor) -> ServiceResult<Vec<ProcurementRequest>> {
        let mut conn = self.pool().acquire().await?;
        if actor.is_admin() {
            Ok(procurement::list(&mut conn).await?)
        } else {
            let user_id = actor.require_user_id()?;
            Ok(procurement::list_by_owner(&mut conn, user_id).await?)
        }
    }

    pub async fn list_shipments(&self, actor: &Actor) -> ServiceResult<Vec<Shipment>> {
        let mut conn = self.pool().acquire().await?;
        if actor.is_admin() {
            Ok(shipment::list(&mut conn).await?)
        } else {
            let user_id = actor.require_user_id()?;
            Ok(shipment::list_by_customer(&mut conn, user_id).await?)
        }
    }

    /// 公开追踪：运单 + 检查点 + 进度
    pub async fn track(&self, tracking_id: &str) -> ServiceResult<ShipmentTracking> {
        let tracking_id = tracking_id.trim();
        let mut conn = self.pool().acquire().await?;
        let found = shipment::find_by_tracking_id(&mut conn, tracking_id)
            .await?
            .ok_or_else(|| shipment_not_found(tracking_id))?;
        let events = shipment::list_events(&mut conn, found.id).await?;
        Ok(ShipmentTracking::new(found, events))
    }

    /// 客户时间线
    ///
    /// - `request`: 已下单 / 已提交，尚未到仓
    /// - `warehouse`: 已到仓，可选择合并
    /// - `shipment`: 客户名下的运单（同步或合并生成）
    ///
    /// 已有运单号或已被合并的物品由其运单代表，不单独列出。
    pub async fn customer_timeline(&self, actor: &Actor, user_id: i64) -> ServiceResult<Vec<TimelineItem>> {
        if !actor.is_admin() && actor.id != Some(user_id) {
            return Err(AppError::permission_denied("Cannot view another customer's timeline").into());
        }

        let mut conn = self.pool().acquire().await?;
        if user::find_by_id(&mut conn, user_id).await?.is_none() {
            return Err(user_not_found(user_id).into());
        }
        let orders = order::list_by_owner(&mut conn, user_id).await?;
        let requests = procurement::list_by_owner(&mut conn, user_id).await?;
        let shipments = shipment::list_by_customer(&mut conn, user_id).await?;

        let mut timeline: Vec<TimelineItem> = Vec::new();
        for o in &orders {
            if let Some(tab) = item_tab(&o.tracking_id, o.consolidated_shipment_id, o.received_at) {
                let names: Vec<String> = o.items.iter().map(|i| i.name.clone()).collect();
                timeline.push(TimelineItem {
                    tab,
                    source: TimelineSource::Item {
                        item_type: ItemType::Shop,
                        item_id: o.id,
                    },
                    title: format!("{} · {}", o.ref_code, shipper_name(&names)),
                    status: o.status,
                    tracking_id: None,
                    progress: progress(o.status),
                    updated_at: o.updated_at,
                });
            }
        }
        for p in &requests {
            if let Some(tab) = item_tab(&p.tracking_id, p.consolidated_shipment_id, p.received_at) {
                timeline.push(TimelineItem {
                    tab,
                    source: TimelineSource::Item {
                        item_type: ItemType::Procurement,
                        item_id: p.id,
                    },
                    title: p.item_name.clone(),
                    status: p.status,
                    tracking_id: None,
                    progress: progress(p.status),
                    updated_at: p.updated_at,
                });
            }
        }
        for s in shipments {
            timeline.push(TimelineItem {
                tab: TimelineTab::Shipment,
                source: TimelineSource::Shipment { shipment_id: s.id },
                title: s.shipper_name,
                status: s.status,
                progress: progress(s.status),
                tracking_id: Some(s.tracking_id),
                updated_at: s.updated_at,
            });
        }

        timeline.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(timeline)
    }
}

/// 物品所在页签；已由运单代表时返回 None
fn item_tab(tracking_id: &Option<String>, consolidated_into: Option<i64>, received_at: Option<i64>) -> Option<TimelineTab> {
    if tracking_id.is_some() || consolidated_into.is_some() {
        None
    } else if received_at.is_some() {
        Some(TimelineTab::Warehouse)
    } else {
        Some(TimelineTab::Request)
    }
}
