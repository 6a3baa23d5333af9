//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`users`] - 用户注册与列表
//! - [`orders`] - 结账、订单列表、管理员更新
//! - [`procurements`] - 代购请求
//! - [`warehouse`] - 仓库签收、合并发货
//! - [`shipments`] - 运单管理、公开追踪
//! - [`customers`] - 客户时间线
//! - [`notifications`] - 收件箱与广播
//! - [`audit`] - 审计日志查询
//!
//! 所有响应都使用 `ApiResponse` 包装。

pub mod actor;

pub mod audit;
pub mod customers;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod procurements;
pub mod shipments;
pub mod users;
pub mod warehouse;

use axum::{Json, Router};
use http::HeaderName;
use shared::error::ApiResponse;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::utils::ServiceError;

pub use actor::HeaderActor;

/// Handler 返回类型
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ServiceError>;

pub(crate) fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(users::router())
        .merge(orders::router())
        .merge(procurements::router())
        .merge(warehouse::router())
        .merge(shipments::router())
        .merge(customers::router())
        .merge(notifications::router())
        .merge(audit::router())
}

/// Build the application with middleware and state
pub fn build_app(state: ServerState) -> Router {
    let request_id = HeaderName::from_static("x-request-id");
    build_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}
