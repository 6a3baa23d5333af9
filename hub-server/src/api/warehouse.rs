//! Warehouse API: receiving and consolidation

use axum::{Json, Router, extract::State, routing::post};
use shared::models::{ConsolidationItem, ConsolidationRequest, ReceiveItemsRequest};

use super::{ApiResult, HeaderActor, ok};
use crate::core::ServerState;
use crate::fulfillment::Consolidation;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/items/receive", post(receive))
        .route("/api/consolidations", post(consolidate))
}

async fn receive(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Json(payload): Json<ReceiveItemsRequest>,
) -> ApiResult<Vec<ConsolidationItem>> {
    ok(state.fulfillment.mark_received(&actor.actor(), payload).await?)
}

async fn consolidate(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Json(payload): Json<ConsolidationRequest>,
) -> ApiResult<Consolidation> {
    ok(state.fulfillment.consolidate(&actor.actor(), payload).await?)
}
