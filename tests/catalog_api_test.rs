mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use common::TestApp;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    if let Some(api_key) = api_key {
        builder = builder.header("x-api-key", api_key);
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn register_login_and_me_flow() {
    let app = TestApp::new().await;
    let router = app.router();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/auth/register",
        None,
        None,
        Some(json!({
            "username": "picker-01",
            "email": "picker01@warehouse.test",
            "password": "a-long-password"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "picker-01");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/auth/login",
        None,
        None,
        Some(json!({"username": "picker-01", "password": "a-long-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(&router, Method::GET, "/api/v1/auth/me", Some(&token), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "picker-01");

    // Wrong password
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/auth/login",
        None,
        None,
        Some(json!({"username": "picker-01", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // No credentials at all
    let (status, _) = send(&router, Method::GET, "/api/v1/auth/me", None, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn product_catalog_round_trip() {
    let app = TestApp::new().await;
    let router = app.router();
    let token = app.token.clone();

    let payload = json!({
        "sku": "KEYBOARD-001",
        "name": "Mechanical Keyboard",
        "price": "89.99",
        "category": "electronics",
        "quantity": 12
    });

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/products",
        Some(&token),
        None,
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["quantity"], 12);

    // Duplicate SKU conflicts
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/products",
        Some(&token),
        None,
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Point lookups by id and by SKU
    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/v1/products/{}", product_id),
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sku"], "KEYBOARD-001");

    let (status, _) = send(
        &router,
        Method::GET,
        "/api/v1/products/sku/KEYBOARD-001",
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/v1/products/{}", uuid::Uuid::new_v4()),
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Update, then deactivate
    let (status, body) = send(
        &router,
        Method::PUT,
        &format!("/api/v1/products/{}", product_id),
        Some(&token),
        None,
        Some(json!({"name": "Mechanical Keyboard v2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Mechanical Keyboard v2");

    let (status, _) = send(
        &router,
        Method::DELETE,
        &format!("/api/v1/products/{}", product_id),
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &router,
        Method::GET,
        &format!("/api/v1/products/{}", product_id),
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(body["data"]["is_active"], false);

    // Unauthenticated requests are refused
    let (status, _) = send(&router, Method::GET, "/api/v1/products", None, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn location_catalog_round_trip() {
    let app = TestApp::new().await;
    let router = app.router();
    let token = app.token.clone();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/locations",
        Some(&token),
        None,
        Some(json!({
            "code": "A-03-02-01",
            "name": "Shelf A-03-02-01",
            "zone": "A",
            "aisle": "03",
            "rack": "02",
            "shelf": "01",
            "capacity": 250
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let location_id = body["data"]["id"].as_str().unwrap().to_string();

    // Zero capacity is invalid
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/locations",
        Some(&token),
        None,
        Some(json!({
            "code": "A-03-02-02",
            "name": "Shelf A-03-02-02",
            "zone": "A",
            "aisle": "03",
            "rack": "02",
            "shelf": "02",
            "capacity": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/locations/code/A-03-02-01",
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["capacity"], 250);

    // Zone filter
    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/locations?zone=A",
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/v1/locations/{}/occupancy", location_id),
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["occupancy"], 0);
    assert_eq!(body["data"]["capacity"], 250);
}

#[tokio::test]
async fn stock_movements_over_http() {
    let app = TestApp::new().await;
    let router = app.router();
    let token = app.token.clone();
    let product = app.seed_product("HTTP-WIDGET", 10).await;
    let location = app.seed_location("H-01-01-01", 20).await;

    // Admitted receipt via JWT
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/stock-movements",
        Some(&token),
        None,
        Some(json!({
            "product_id": product.id,
            "location_id": location.id,
            "type": "IN",
            "quantity": 15,
            "reference": "PO-1001"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let movement_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["type"], "IN");
    assert_eq!(body["data"]["product"]["quantity"], 25);

    // Capacity rejection surfaces as 422 with the specific reason
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/stock-movements",
        Some(&token),
        None,
        Some(json!({
            "product_id": product.id,
            "location_id": location.id,
            "type": "IN",
            "quantity": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("capacity"));

    // Insufficient stock rejection
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/stock-movements",
        Some(&token),
        None,
        Some(json!({
            "product_id": product.id,
            "location_id": location.id,
            "type": "OUT",
            "quantity": 30
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Insufficient stock"));

    // Non-positive quantity is a plain validation error
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/stock-movements",
        Some(&token),
        None,
        Some(json!({
            "product_id": product.id,
            "location_id": location.id,
            "type": "OUT",
            "quantity": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // API key authentication records the same acting user
    let api_key = app.operator.api_key.clone().unwrap();
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/stock-movements",
        None,
        Some(&api_key),
        Some(json!({
            "product_id": product.id,
            "location_id": location.id,
            "type": "OUT",
            "quantity": 5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Point lookup and list only show the two admitted movements
    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/v1/stock-movements/{}", movement_id),
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["quantity"], 15);
    assert_eq!(body["data"]["user"]["username"], "operator");

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/stock-movements?type=IN",
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/v1/products/{}/movements", product.id),
        Some(&token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
}
