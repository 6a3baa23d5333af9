//! Procurement API

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use shared::models::{ProcurementCreate, ProcurementRequest, ProcurementUpdate};

use super::{ApiResult, HeaderActor, ok};
use crate::core::ServerState;
use crate::fulfillment::ItemUpdate;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/procurements", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", patch(update))
}

async fn create(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Json(payload): Json<ProcurementCreate>,
) -> ApiResult<ProcurementRequest> {
    ok(state.fulfillment.create_procurement(&actor.actor(), payload).await?)
}

async fn list(State(state): State<ServerState>, actor: HeaderActor) -> ApiResult<Vec<ProcurementRequest>> {
    ok(state.fulfillment.list_procurements(&actor.actor()).await?)
}

async fn update(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Path(id): Path<i64>,
    Json(payload): Json<ProcurementUpdate>,
) -> ApiResult<ItemUpdate<ProcurementRequest>> {
    ok(state.fulfillment.update_procurement(&actor.actor(), id, payload).await?)
}
