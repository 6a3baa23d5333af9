//! 工具模块
//!
//! - [`error`] - 服务层错误 `ServiceError`
//! - [`logger`] - 日志初始化
//! - [`retry`] - 主路径超时与单次重试

pub mod error;
pub mod logger;
pub mod retry;

pub use error::{ServiceError, ServiceResult};
pub use retry::run_primary;
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
