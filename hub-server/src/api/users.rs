//! User API

use axum::{Json, Router, extract::State, routing::get};
use shared::models::{User, UserCreate};

use super::{ApiResult, HeaderActor, ok};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/users", get(list).post(register))
}

async fn register(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Json(payload): Json<UserCreate>,
) -> ApiResult<User> {
    ok(state.fulfillment.register_user(&actor.actor(), payload).await?)
}

async fn list(State(state): State<ServerState>, actor: HeaderActor) -> ApiResult<Vec<User>> {
    ok(state.fulfillment.list_users(&actor.actor()).await?)
}
