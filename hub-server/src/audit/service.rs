//! 审计日志服务
//!
//! 写入端通过 [`AuditPort`] 注入业务层，两种实现：
//!
//! - [`AuditLedger`] - 直接写入（单次尝试，有超时）
//! - [`QueuedAudit`] - 投递到 mpsc 通道，由 [`super::AuditWorker`] 按序写入
//!
//! 两者都是 best-effort：写入失败只记录日志，不影响已提交的业务事务。
//! 查询直接读取 storage。

use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use super::storage::{AuditStorage, AuditStorageResult};
use super::types::*;

/// 审计写入端口
#[async_trait]
pub trait AuditPort: Send + Sync {
    /// 记录一次操作；失败不向调用方传播
    async fn record(&self, record: AuditRecord);
}

/// 审计账本（直接写入 + 查询）
#[derive(Debug, Clone)]
pub struct AuditLedger {
    storage: AuditStorage,
    /// 单次写入的上限
    timeout: Duration,
}

impl AuditLedger {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self {
            storage: AuditStorage::new(pool),
            timeout,
        }
    }

    pub fn storage(&self) -> &AuditStorage {
        &self.storage
    }

    /// 查询审计日志（分页）
    pub async fn query(&self, q: &AuditQuery) -> AuditStorageResult<AuditListResponse> {
        let items = self.storage.query(q).await?;
        let total = self.storage.count(q).await?;
        Ok(AuditListResponse { items, total })
    }

    /// 某实体的全部审计记录
    pub async fn history(&self, entity_type: &str, entity_id: &str) -> AuditStorageResult<Vec<AuditEntry>> {
        let q = AuditQuery {
            limit: Some(MAX_AUDIT_LIMIT),
            ..AuditQuery::for_entity(entity_type, entity_id)
        };
        self.storage.query(&q).await
    }
}

#[async_trait]
impl AuditPort for AuditLedger {
    async fn record(&self, record: AuditRecord) {
        match tokio::time::timeout(self.timeout, self.storage.append(&record)).await {
            Ok(Ok(entry)) => {
                tracing::debug!(
                    target: "audit",
                    audit_id = entry.id,
                    action = %entry.action,
                    entity = %entry.entity_type,
                    "Audit entry recorded"
                );
            }
            Ok(Err(e)) => {
                tracing::error!(
                    target: "audit",
                    action = %record.action,
                    entity = %record.entity_type,
                    error = %e,
                    "Failed to write audit entry"
                );
            }
            Err(_) => {
                tracing::warn!(
                    target: "audit",
                    action = %record.action,
                    entity = %record.entity_type,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Degraded: audit entry write timed out"
                );
            }
        }
    }
}

/// 队列写入端
///
/// 记录在事务提交后构造并带上发生时间；入队顺序可能与提交顺序不同，
/// 查询按发生时间排序，不依赖写入顺序。
#[derive(Debug, Clone)]
pub struct QueuedAudit {
    tx: mpsc::Sender<AuditRecord>,
}

impl QueuedAudit {
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<AuditRecord>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AuditPort for QueuedAudit {
    async fn record(&self, record: AuditRecord) {
        if let Err(e) = self.tx.try_send(record) {
            let (reason, record) = match e {
                mpsc::error::TrySendError::Full(r) => ("queue full", r),
                mpsc::error::TrySendError::Closed(r) => ("worker stopped", r),
            };
            tracing::warn!(
                target: "audit",
                action = %record.action,
                entity = %record.entity_type,
                reason,
                "Audit entry dropped"
            );
        }
    }
}
