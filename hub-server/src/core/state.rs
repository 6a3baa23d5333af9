use std::sync::Arc;

use sqlx::SqlitePool;

use crate::audit::{AuditLedger, AuditPort, AuditWorker, QueuedAudit};
use crate::core::Config;
use crate::fulfillment::FulfillmentService;
use crate::notify::{NotificationDispatcher, NotifyPort};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 克隆成本极低（内部都是连接池句柄和 Arc）。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | 数据库连接池 |
/// | audit | AuditLedger | 审计查询 |
/// | notifications | NotificationDispatcher | 广播与收件箱 |
/// | fulfillment | FulfillmentService | 履约动作与读模型 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub audit: AuditLedger,
    pub notifications: NotificationDispatcher,
    pub fulfillment: FulfillmentService,
}

impl ServerState {
    /// 打开数据库、执行迁移并组装服务
    pub async fn initialize(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = crate::db::open_pool(config).await?;
        Ok(Self::with_pool(config.clone(), pool))
    }

    /// 用已有连接池组装服务
    ///
    /// `audit_queue_size > 0` 时启动后台审计 worker，需要在 tokio 运行时内调用。
    pub fn with_pool(config: Config, pool: SqlitePool) -> Self {
        let ledger = AuditLedger::new(pool.clone(), config.operation_timeout());
        let audit: Arc<dyn AuditPort> = if config.audit_queue_size > 0 {
            let (queued, rx) = QueuedAudit::new(config.audit_queue_size);
            tokio::spawn(AuditWorker::new(ledger.clone()).run(rx));
            Arc::new(queued)
        } else {
            Arc::new(ledger.clone())
        };

        let notifications = NotificationDispatcher::new(pool.clone(), audit.clone(), config.operation_timeout());
        let notifier: Arc<dyn NotifyPort> = Arc::new(notifications.clone());
        let fulfillment = FulfillmentService::new(pool.clone(), audit, notifier, &config);

        tracing::info!(
            policy = config.transition_policy.as_str(),
            queued_audit = config.audit_queue_size > 0,
            "Server state initialized"
        );

        Self {
            config,
            pool,
            audit: ledger,
            notifications,
            fulfillment,
        }
    }
}
