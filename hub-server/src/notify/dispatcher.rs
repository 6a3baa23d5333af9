//! 通知分发
//!
//! - 单用户通知：best-effort，有超时，失败只记录日志
//! - 广播：一个事务内给每个注册用户写一条通知，全部成功或全部失败，
//!   成功后写一条审计记录（带收件人数）
//! - 收件箱：列表、未读数、已读标记

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{BroadcastReceipt, Notification};
use sqlx::SqlitePool;

use super::compose::OutboundMessage;
use crate::audit::{AuditAction, AuditMetadata, AuditPort, AuditRecord};
use crate::auth::Actor;
use crate::db::repository::notification;
use crate::utils::{ServiceResult, run_primary};

const DEFAULT_INBOX_LIMIT: i64 = 50;
const MAX_INBOX_LIMIT: i64 = 200;

/// 通知写入端口
#[async_trait]
pub trait NotifyPort: Send + Sync {
    /// 给单个用户写一条未读通知；失败不向调用方传播
    async fn notify_user(&self, user_id: i64, title: &str, message: &str);
}

/// 通知分发器
#[derive(Clone)]
pub struct NotificationDispatcher {
    pool: SqlitePool,
    audit: Arc<dyn AuditPort>,
    timeout: Duration,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(pool: SqlitePool, audit: Arc<dyn AuditPort>, timeout: Duration) -> Self {
        Self { pool, audit, timeout }
    }

    pub async fn send(&self, user_id: i64, message: &OutboundMessage) {
        self.notify_user(user_id, &message.title, &message.message).await;
    }

    /// 广播给所有注册用户，返回收件人数
    pub async fn broadcast(&self, actor: &Actor, title: &str, message: &str) -> ServiceResult<BroadcastReceipt> {
        actor.require_admin()?;
        let title = title.trim();
        let message = message.trim();
        if title.is_empty() {
            return Err(AppError::required("title").into());
        }
        if message.is_empty() {
            return Err(AppError::required("message").into());
        }

        let count = run_primary("broadcast", self.timeout, || self.broadcast_once(title, message)).await?;

        tracing::info!(recipients = count, actor = %actor.name, "Broadcast sent");
        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::BroadcastSent,
                    "notification",
                    format!("Broadcast \"{}\" to {} users", title, count),
                    actor,
                )
                .metadata(AuditMetadata::Broadcast { recipient_count: count }),
            )
            .await;

        Ok(BroadcastReceipt { count })
    }

    async fn broadcast_once(&self, title: &str, message: &str) -> ServiceResult<u64> {
        let mut tx = crate::db::begin_write(&self.pool).await?;
        let recipients = crate::db::repository::user::list_ids(&mut tx).await?;
        let now = shared::util::now_millis();
        for user_id in &recipients {
            notification::insert(&mut tx, *user_id, title, message, now).await?;
        }
        tx.commit().await?;
        Ok(recipients.len() as u64)
    }

    /// 用户收件箱，最新在前
    pub async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: Option<i64>,
    ) -> ServiceResult<Vec<Notification>> {
        let limit = limit.unwrap_or(DEFAULT_INBOX_LIMIT).clamp(1, MAX_INBOX_LIMIT);
        let mut conn = self.pool.acquire().await?;
        Ok(notification::list_for_user(&mut conn, user_id, unread_only, limit).await?)
    }

    pub async fn unread_count(&self, user_id: i64) -> ServiceResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let count = notification::unread_count(&mut conn, user_id).await?;
        Ok(count.max(0) as u64)
    }

    /// 标记单条已读；不是自己的通知视为不存在
    pub async fn mark_read(&self, actor: &Actor, notification_id: i64) -> ServiceResult<()> {
        let user_id = actor.require_user_id()?;
        let mut conn = self.pool.acquire().await?;
        if !notification::exists_for_user(&mut conn, user_id, notification_id).await? {
            return Err(AppError::with_message(
                ErrorCode::NotificationNotFound,
                format!("Notification {} not found", notification_id),
            )
            .into());
        }
        let changed = notification::mark_read(&mut conn, user_id, notification_id).await?;
        drop(conn);

        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::NotificationsRead,
                    "notification",
                    format!("Notification {} marked read", notification_id),
                    actor,
                )
                .entity(notification_id)
                .metadata(AuditMetadata::Read { count: changed }),
            )
            .await;
        Ok(())
    }

    /// 全部标记已读，返回本次标记数
    pub async fn mark_all_read(&self, actor: &Actor) -> ServiceResult<u64> {
        let user_id = actor.require_user_id()?;
        let mut conn = self.pool.acquire().await?;
        let changed = notification::mark_all_read(&mut conn, user_id).await?;
        drop(conn);

        self.audit
            .record(
                AuditRecord::new(
                    AuditAction::NotificationsRead,
                    "user",
                    format!("{} notifications marked read", changed),
                    actor,
                )
                .entity(user_id)
                .metadata(AuditMetadata::Read { count: changed }),
            )
            .await;
        Ok(changed)
    }
}

#[async_trait]
impl NotifyPort for NotificationDispatcher {
    async fn notify_user(&self, user_id: i64, title: &str, message: &str) {
        let now = shared::util::now_millis();
        let write = async {
            match self.pool.acquire().await {
                Ok(mut conn) => notification::insert(&mut conn, user_id, title, message, now).await,
                Err(e) => Err(e),
            }
        };
        match tokio::time::timeout(self.timeout, write).await {
            Ok(Ok(id)) => tracing::debug!(target: "notify", notification_id = id, user_id, "Notification stored"),
            Ok(Err(e)) => tracing::warn!(
                target: "notify",
                user_id,
                title,
                error = %e,
                "Degraded: notification not delivered"
            ),
            Err(_) => tracing::warn!(
                target: "notify",
                user_id,
                title,
                timeout_ms = self.timeout.as_millis() as u64,
                "Degraded: notification write timed out"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLedger;
    use crate::core::Config;
    use shared::models::UserRole;

    async fn dispatcher(timeout: Duration) -> (NotificationDispatcher, i64) {
        let pool = crate::db::open_pool(&Config::for_tests()).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let user = crate::db::repository::user::insert(&mut conn, "Ama", None, UserRole::Customer)
            .await
            .unwrap();
        drop(conn);
        let audit = Arc::new(AuditLedger::new(pool.clone(), timeout));
        (NotificationDispatcher::new(pool, audit, timeout), user.id)
    }

    #[tokio::test]
    async fn test_notify_user_stores_unread() {
        let (dispatcher, user_id) = dispatcher(Duration::from_secs(5)).await;
        dispatcher.notify_user(user_id, "Order update", "Shipped").await;

        let inbox = dispatcher.list_for_user(user_id, true, None).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "Order update");
        assert_eq!(dispatcher.unread_count(user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blocked_store_does_not_block_caller() {
        let (dispatcher, user_id) = dispatcher(Duration::from_millis(50)).await;

        // 内存库只有一个连接，占住它
        let held = dispatcher.pool.acquire().await.unwrap();
        let returned = tokio::time::timeout(
            Duration::from_secs(1),
            dispatcher.notify_user(user_id, "Order update", "Shipped"),
        )
        .await;
        assert!(returned.is_ok());
        drop(held);

        assert_eq!(dispatcher.unread_count(user_id).await.unwrap(), 0);
    }
}
