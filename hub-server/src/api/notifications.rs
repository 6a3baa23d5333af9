//! Notification API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/notifications | GET | 当前用户收件箱 |
//! | /api/notifications/unread-count | GET | 未读数 |
//! | /api/notifications/{id}/read | POST | 标记已读 |
//! | /api/notifications/read-all | POST | 全部已读 |
//! | /api/notifications/broadcast | POST | 广播（管理员） |

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use shared::models::{BroadcastReceipt, BroadcastRequest, Notification};

use super::{ApiResult, HeaderActor, ok};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/notifications", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/broadcast", post(broadcast))
        .route("/{id}/read", post(mark_read))
}

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

async fn list(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Vec<Notification>> {
    let user_id = actor.actor().require_user_id()?;
    ok(state
        .notifications
        .list_for_user(user_id, query.unread_only, query.limit)
        .await?)
}

async fn unread_count(State(state): State<ServerState>, actor: HeaderActor) -> ApiResult<CountResponse> {
    let user_id = actor.actor().require_user_id()?;
    let count = state.notifications.unread_count(user_id).await?;
    ok(CountResponse { count })
}

async fn mark_read(State(state): State<ServerState>, actor: HeaderActor, Path(id): Path<i64>) -> ApiResult<()> {
    state.notifications.mark_read(&actor.actor(), id).await?;
    ok(())
}

async fn mark_all_read(State(state): State<ServerState>, actor: HeaderActor) -> ApiResult<CountResponse> {
    let count = state.notifications.mark_all_read(&actor.actor()).await?;
    ok(CountResponse { count })
}

async fn broadcast(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Json(payload): Json<BroadcastRequest>,
) -> ApiResult<BroadcastReceipt> {
    ok(state
        .notifications
        .broadcast(&actor.actor(), &payload.title, &payload.message)
        .await?)
}
