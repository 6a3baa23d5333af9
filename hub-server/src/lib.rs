//! MQM Hub Server - 订单 / 代购 → 运单对账引擎
//!
//! # 架构概述
//!
//! ```text
//! 状态变更动作
//!   └─ FulfillmentService (事务 + 超时 + 单次重试)
//!        ├─ StateMachine   状态迁移 / 运单事件
//!        ├─ SyncEngine     按 tracking_id 幂等生成运单
//!        └─ ConsolidationBuilder 仓库件合并发运
//!   提交之后:
//!        ├─ AuditPort      审计账本（尽力而为，失败只记日志）
//!        └─ NotifyPort     通知客户（尽力而为，失败只记日志）
//! ```
//!
//! # 模块结构
//!
//! ```text
//! hub-server/src/
//! ├── core/          # 配置、服务状态
//! ├── auth/          # 操作人 (Actor) 与 ActorProvider
//! ├── db/            # SQLite 连接池、迁移、仓储
//! ├── audit/         # 只追加审计账本
//! ├── notify/        # 通知分发、消息拼装
//! ├── fulfillment/   # 状态机、同步引擎、合并发运、读模型
//! ├── api/           # HTTP 路由
//! └── utils/         # 错误、日志、重试
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod db;
pub mod fulfillment;
pub mod notify;
pub mod utils;

// Re-export 公共类型
pub use auth::{Actor, ActorProvider, ActorRole};
pub use core::{Config, ServerState};
pub use fulfillment::FulfillmentService;
pub use utils::{ServiceError, ServiceResult};

// Re-export logger functions
pub use utils::logger::init_logger;
