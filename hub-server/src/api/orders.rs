//! Order API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders | POST | 结账（访客可用） |
//! | /api/orders | GET | 订单列表（管理员全部，客户自己的） |
//! | /api/orders/{id} | PATCH | 管理员更新状态 / 运单号 |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use shared::models::{CheckoutReceipt, CheckoutRequest, Order, OrderUpdate};

use super::{ApiResult, HeaderActor, ok};
use crate::core::ServerState;
use crate::fulfillment::ItemUpdate;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list).post(checkout))
        .route("/{id}", patch(update))
}

async fn checkout(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Json(payload): Json<CheckoutRequest>,
) -> ApiResult<CheckoutReceipt> {
    ok(state.fulfillment.checkout(&actor.actor(), payload).await?)
}

async fn list(State(state): State<ServerState>, actor: HeaderActor) -> ApiResult<Vec<Order>> {
    ok(state.fulfillment.list_orders(&actor.actor()).await?)
}

async fn update(
    State(state): State<ServerState>,
    actor: HeaderActor,
    Path(id): Path<i64>,
    Json(payload): Json<OrderUpdate>,
) -> ApiResult<ItemUpdate<Order>> {
    ok(state.fulfillment.update_order(&actor.actor(), id, payload).await?)
}
