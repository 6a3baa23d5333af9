//! 审计日志后台 Worker
//!
//! 从 mpsc 通道消费 AuditRecord，写入 SQLite。
//! 通道关闭时自动退出。

use tokio::sync::mpsc;

use super::service::{AuditLedger, AuditPort};
use super::types::AuditRecord;

/// 审计日志后台 Worker
pub struct AuditWorker {
    ledger: AuditLedger,
}

impl AuditWorker {
    pub fn new(ledger: AuditLedger) -> Self {
        Self { ledger }
    }

    /// 运行 worker（阻塞直到通道关闭）
    pub async fn run(self, mut rx: mpsc::Receiver<AuditRecord>) {
        tracing::info!(target: "audit", "Audit log worker started");

        while let Some(record) = rx.recv().await {
            self.ledger.record(record).await;
        }

        tracing::info!(target: "audit", "Audit log channel closed, worker stopping");
    }
}
