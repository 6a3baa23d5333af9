//! Shipment API
//!
//! | 路径 | 方法 | 说明 | 身份 |
//! |------|------|------|------|
//! | /api/shipments | POST | 手工建运单 | 管理员 |
//! | /api/shipments | GET | 运单列表 | 管理员全部，客户自己的 |
//! | /api/shipments/{id}/status | PATCH | 更新状态并追加检查点 | 管理员 |
//! | /api/track/{tracking_id} | GET | 公开追踪 | 无 |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use shared::models::{Shipment, ShipmentCreate, ShipmentStatusUpdate, ShipmentTracking};

use super::{ApiResult, HeaderActor, ok};
use crate::core::ServerState;
use crate::fulfillment::ShipmentTransition;

pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/shipments", routes())
        .route("/api/track/{tracking_id}", get(track))
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}/status", patch(update_status))
}

async fn create(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Json(payload): Json<ShipmentCreate>,
) -> ApiResult<Shipment> {
    ok(state.fulfillment.create_shipment(&actor.actor(), payload).await?)
}

async fn list(State(state): State<ServerState>, actor: HeaderActor) -> ApiResult<Vec<Shipment>> {
    ok(state.fulfillment.list_shipments(&actor.actor()).await?)
}

async fn update_status(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Path(id): Path<i64>,
    Json(payload): Json<ShipmentStatusUpdate>,
) -> ApiResult<ShipmentTransition> {
    ok(state.fulfillment.update_shipment_status(&actor.actor(), id, payload).await?)
}

async fn track(State(state): State<ServerState>, Path(tracking_id): Path<String>) -> ApiResult<ShipmentTracking> {
    ok(state.fulfillment.track(&tracking_id).await?)
}
