//! Customer timeline API

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use shared::models::TimelineItem;

use super::{ApiResult, HeaderActor, ok};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/customers/{id}/timeline", get(timeline))
}

async fn timeline(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Path(id): Path<i64>,
) -> ApiResult<Vec<TimelineItem>> {
    ok(state.fulfillment.customer_timeline(&actor.actor(), id).await?)
}
