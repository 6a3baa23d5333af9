//! HTTP 层集成测试：路由、请求头身份、错误映射

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use hub_server::{Config, ServerState, api};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> Router {
    let state = ServerState::initialize(&Config::for_tests()).await.expect("state");
    api::build_app(state)
}

fn admin_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-id", "1")
        .header("x-actor-name", "Ops")
        .header("x-actor-role", "admin")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
    assert_eq!(body["transition_policy"], "permissive");
}

#[tokio::test]
async fn test_guest_checkout_then_public_tracking() {
    let app = app().await;
    let checkout = Request::builder()
        .method("POST")
        .uri("/api/orders")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "customer_name": "Ama Mensah",
                "items": [{ "name": "Shea Butter", "quantity": 2, "unit_price": 12.5 }]
            })
            .to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, checkout).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["order"]["status"], "Pending");
    let order_id = body["data"]["order"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        admin_request(
            "PATCH",
            &format!("/api/orders/{}", order_id),
            json!({ "status": "Processing", "tracking_id": "TRK-000555" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["shipment_created"], true);
    let shipment_id = body["data"]["shipment"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        admin_request(
            "PATCH",
            &format!("/api/shipments/{}/status", shipment_id),
            json!({ "status": "In Transit", "location": "Accra Hub" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let track = Request::builder().uri("/api/track/TRK-000555").body(Body::empty()).unwrap();
    let (status, body) = send(&app, track).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["shipment"]["status"], "In Transit");
    assert_eq!(body["data"]["progress"], 60);
    assert_eq!(body["data"]["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_customer_headers_cannot_create_shipments() {
    let app = app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/shipments")
        .header("content-type", "application/json")
        .header("x-actor-id", "7")
        .header("x-actor-role", "customer")
        .body(Body::from(json!({ "shipper_name": "x", "recipient_name": "y" }).to_string()))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2003);
}

#[tokio::test]
async fn test_system_role_header_rejected() {
    let app = app().await;
    let request = Request::builder()
        .uri("/api/users")
        .header("x-actor-role", "system")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_tracking_id_is_conflict() {
    let app = app().await;
    let payload = json!({ "tracking_id": "TRK-010101", "shipper_name": "Supplier", "recipient_name": "Kojo" });

    let (status, _) = send(&app, admin_request("POST", "/api/shipments", payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, admin_request("POST", "/api/shipments", payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 5002);
}

#[tokio::test]
async fn test_broadcast_and_audit_query() {
    let app = app().await;
    for name in ["Ama", "Kofi"] {
        let (status, _) = send(&app, admin_request("POST", "/api/users", json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        admin_request(
            "POST",
            "/api/notifications/broadcast",
            json!({ "title": "Notice", "message": "Closed Friday" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);

    let audit = Request::builder()
        .uri("/api/audit?action=broadcast_sent")
        .header("x-actor-id", "1")
        .header("x-actor-role", "admin")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, audit).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["metadata"]["recipient_count"], 2);

    let inbox = Request::builder()
        .uri("/api/notifications/unread-count")
        .header("x-actor-id", "2")
        .header("x-actor-role", "customer")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, inbox).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
}
