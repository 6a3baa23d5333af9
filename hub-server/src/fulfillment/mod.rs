//! 履约核心
//!
//! ```text
//! 状态变更 ──▶ StateMachine ──▶ SyncEngine(确保运单) ──▶ 运单检查点
//!                                   │
//!                     (提交后) AuditPort + NotifyPort
//! ```
//!
//! - [`state_machine`] - 迁移策略、运单检查点
//! - [`sync`] - 订单 / 代购到运单的幂等同步
//! - [`consolidate`] - 合并发货
//! - [`service`] - 动作处理（事务、超时、重试、副作用）
//! - [`views`] - 读模型

pub mod consolidate;
pub mod service;
pub mod state_machine;
pub mod sync;
mod views;

pub use consolidate::{Consolidation, ConsolidationBuilder, IneligibleReason};
pub use service::{FulfillmentService, ItemUpdate};
pub use state_machine::{EntityKind, ShipmentTransition, StateMachine, TransitionPolicy};
pub use sync::{SyncEngine, SyncOutcome, SyncSource};
