//! 审计日志模块
//!
//! 不可变、只追加的操作记录。每个改变状态的操作恰好产生一条记录。
//!
//! # 架构
//!
//! ```text
//! FulfillmentService ──(提交后)──▶ AuditPort
//!                                   ├─ AuditLedger ──▶ audit_logs
//!                                   └─ QueuedAudit ──mpsc──▶ AuditWorker ──▶ audit_logs
//! ```

mod service;
mod storage;
mod types;
mod worker;

pub use service::{AuditLedger, AuditPort, QueuedAudit};
pub use storage::{AuditStorage, AuditStorageError, AuditStorageResult};
pub use types::*;
pub use worker::AuditWorker;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::Actor;
    use crate::core::Config;

    async fn ledger() -> AuditLedger {
        let pool = crate::db::open_pool(&Config::for_tests()).await.unwrap();
        AuditLedger::new(pool, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_record_then_query_newest_first() {
        let ledger = ledger().await;
        let admin = Actor::admin(1, "Kofi");
        ledger
            .record(AuditRecord::new(AuditAction::OrderCreated, "order", "first", &admin).entity(1))
            .await;
        ledger
            .record(
                AuditRecord::new(AuditAction::OrderUpdated, "order", "second", &admin)
                    .entity(1)
                    .metadata(AuditMetadata::StatusChange {
                        from: shared::Status::Pending,
                        to: shared::Status::Processing,
                        tracking_id: None,
                        location: None,
                        synced_shipment_id: None,
                    }),
            )
            .await;

        let page = ledger.query(&AuditQuery::for_entity("order", 1)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].details, "second");
        assert_eq!(page.items[0].kind, ActionKind::Update);
        assert_eq!(page.items[1].kind, ActionKind::Create);
        assert_eq!(page.items[1].actor_name, "Kofi");
        assert!(matches!(page.items[0].metadata, Some(AuditMetadata::StatusChange { .. })));
    }

    #[tokio::test]
    async fn test_filter_by_kind() {
        let ledger = ledger().await;
        let system = Actor::system();
        ledger
            .record(AuditRecord::new(AuditAction::BroadcastSent, "notification", "hi", &system))
            .await;
        ledger
            .record(AuditRecord::new(AuditAction::UserRegistered, "user", "u", &system).entity(3))
            .await;

        let q = AuditQuery {
            kind: Some(ActionKind::Broadcast),
            ..Default::default()
        };
        let page = ledger.query(&q).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].action, AuditAction::BroadcastSent);
        assert_eq!(page.items[0].actor_id, None);
    }

    #[tokio::test]
    async fn test_unknown_metadata_survives_read() {
        let ledger = ledger().await;
        let payload = serde_json::json!({ "kind": "legacy_import", "rows": 12 });
        ledger
            .record(
                AuditRecord::new(AuditAction::OrderUpdated, "order", "import", &Actor::system())
                    .metadata(AuditMetadata::Raw { payload: payload.clone() }),
            )
            .await;

        let page = ledger.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(page.items[0].metadata, Some(AuditMetadata::Raw { payload }));
    }

    #[tokio::test]
    async fn test_rows_cannot_be_changed_or_removed() {
        let ledger = ledger().await;
        ledger
            .record(AuditRecord::new(AuditAction::UserRegistered, "user", "u", &Actor::system()))
            .await;
        let pool = ledger.storage().pool().clone();

        let update = sqlx::query("UPDATE audit_logs SET details = 'tampered'").execute(&pool).await;
        assert!(update.is_err());
        let delete = sqlx::query("DELETE FROM audit_logs").execute(&pool).await;
        assert!(delete.is_err());

        let page = ledger.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].details, "u");
    }

    #[tokio::test]
    async fn test_queued_writes_keep_order() {
        let ledger = ledger().await;
        let (queued, rx) = QueuedAudit::new(16);
        let worker = tokio::spawn(AuditWorker::new(ledger.clone()).run(rx));

        for i in 0..5 {
            queued
                .record(AuditRecord::new(AuditAction::OrderUpdated, "order", format!("step {}", i), &Actor::system()))
                .await;
        }
        drop(queued);
        worker.await.unwrap();

        let page = ledger.query(&AuditQuery::default()).await.unwrap();
        let details: Vec<_> = page.items.iter().rev().map(|e| e.details.clone()).collect();
        assert_eq!(details, vec!["step 0", "step 1", "step 2", "step 3", "step 4"]);
    }

    #[tokio::test]
    async fn test_queued_records_sort_by_occurrence() {
        let ledger = ledger().await;
        let (queued, rx) = QueuedAudit::new(16);

        // 先提交的请求后入队
        let admin = Actor::admin(1, "Kofi");
        let mut earlier = AuditRecord::new(AuditAction::OrderUpdated, "order", "committed first", &admin).entity(7);
        earlier.occurred_at = 1_700_000_000_000;
        let mut later = AuditRecord::new(AuditAction::OrderUpdated, "order", "committed second", &admin).entity(7);
        later.occurred_at = 1_700_000_000_250;
        queued.record(later).await;
        queued.record(earlier).await;
        drop(queued);
        AuditWorker::new(ledger.clone()).run(rx).await;

        let page = ledger.query(&AuditQuery::for_entity("order", 7)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].details, "committed second");
        assert_eq!(page.items[0].created_at, 1_700_000_000_250);
        assert_eq!(page.items[1].details, "committed first");
        assert_eq!(page.items[1].created_at, 1_700_000_000_000);

        // 时间范围过滤同样基于发生时间
        let q = AuditQuery {
            to: Some(1_700_000_000_100),
            ..AuditQuery::for_entity("order", 7)
        };
        let page = ledger.query(&q).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].details, "committed first");
    }

    #[tokio::test]
    async fn test_blocked_store_does_not_block_caller() {
        let pool = crate::db::open_pool(&Config::for_tests()).await.unwrap();
        let ledger = AuditLedger::new(pool.clone(), Duration::from_millis(50));

        // 内存库只有一个连接，占住它
        let held = pool.acquire().await.unwrap();
        let record = AuditRecord::new(AuditAction::UserRegistered, "user", "u", &Actor::system());
        let returned = tokio::time::timeout(Duration::from_secs(1), ledger.record(record)).await;
        assert!(returned.is_ok());
        drop(held);

        let page = ledger.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }
}
