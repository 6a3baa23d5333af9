//! 审计日志查询 API（管理员）

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use shared::error::AppError;

use super::{ApiResult, HeaderActor, ok};
use crate::audit::{AuditListResponse, AuditQuery};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/audit", get(list))
}

async fn list(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Query(query): Query<AuditQuery>,
) -> ApiResult<AuditListResponse> {
    actor.actor().require_admin()?;
    let page = state.audit.query(&query).await.map_err(AppError::from)?;
    ok(page)
}
