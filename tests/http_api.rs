//! Router tests driven through `tower::ServiceExt::oneshot`

use std::str::FromStr;
use std::sync::Arc;

use axum::{body::Body, http::{Request, StatusCode}, Router};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use artisan_marketplace::api::{router, AppState};
use artisan_marketplace::config::OrderPolicy;
use artisan_marketplace::infrastructure::{EventPublisher, InMemoryStore};

fn app() -> Router {
    router(AppState::new(Arc::new(InMemoryStore::new()), EventPublisher::default(), OrderPolicy::default()))
}

struct Caller {
    id: Uuid,
    role: &'static str,
}

impl Caller {
    fn new(role: &'static str) -> Self {
        Self { id: Uuid::new_v4(), role }
    }
}

async fn send(app: &Router, method: &str, uri: &str, caller: Option<&Caller>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(c) = caller {
        req = req.header("x-user-id", c.id.to_string()).header("x-user-role", c.role);
    }
    let req = match body {
        Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())).unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn decimal(v: &Value) -> Decimal {
    match v {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}

async fn create_product(app: &Router, seller: &Caller, price: u32, quantity: u32) -> String {
    let (status, body) = send(app, "POST", "/api/v1/products", Some(seller), Some(json!({
        "name": "Beaded necklace",
        "description": "Glass beads on waxed cord",
        "category": "jewellery",
        "price": price,
        "quantity": quantity,
        "craftingTime": "5 days"
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

fn order_body(items: Value) -> Value {
    json!({
        "items": items,
        "shippingAddress": {
            "name": "Kemi Bello",
            "street1": "4 Palm Avenue",
            "city": "Accra",
            "zip": "00233",
            "country": "GH"
        },
        "payment": {"method": "mobile_money"},
        "shipping": {"method": "standard"}
    })
}

#[tokio::test]
async fn health_reports_service() {
    let (status, body) = send(&app(), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn missing_identity_is_unauthenticated() {
    let (status, body) = send(&app(), "GET", "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTHENTICATION_REQUIRED");

    let bogus = Caller::new("wizard");
    let (status, _) = send(&app(), "GET", "/api/v1/orders", Some(&bogus), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn place_pay_and_read_back_an_order() {
    let app = app();
    let seller = Caller::new("artisan");
    let buyer = Caller::new("customer");
    let a = create_product(&app, &seller, 100, 10).await;
    let b = create_product(&app, &seller, 250, 10).await;

    let (status, order) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(order_body(json!([
        {"productId": a, "quantity": 2},
        {"productId": b, "quantity": 1}
    ]))))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending_payment");
    assert_eq!(decimal(&order["pricing"]["subtotal"]["amount"]), Decimal::from(450));
    assert_eq!(decimal(&order["pricing"]["totalAmount"]["amount"]), Decimal::from(650));
    let id = order["id"].as_str().unwrap().to_string();

    let (status, order) = send(&app, "PUT", &format!("/api/v1/orders/{id}/payment"), Some(&buyer), Some(json!({
        "paymentStatus": "completed",
        "transactionId": "psp-8812"
    })))
    .await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["status"], "paid");
    assert_eq!(order["payment"]["transactionId"], "psp-8812");

    let (status, product) = send(&app, "GET", &format!("/api/v1/products/{a}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["quantity"], 8);
    assert_eq!(product["reservedQuantity"], 0);
    assert_eq!(product["soldCount"], 2);

    let (status, list) = send(&app, "GET", "/api/v1/orders?page=1&perPage=5", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
    assert_eq!(list["perPage"], 5);

    let (status, profile) = send(&app, "GET", &format!("/api/v1/customers/{}/profile", buyer.id), Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["loyaltyPoints"], 6);
    assert_eq!(profile["totalOrders"], 1);
}

#[tokio::test]
async fn insufficient_stock_reports_details() {
    let app = app();
    let seller = Caller::new("supplier");
    let buyer = Caller::new("customer");
    let a = create_product(&app, &seller, 40, 2).await;

    let (status, body) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(order_body(json!([
        {"productId": a, "quantity": 3}
    ]))))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["productId"], a.as_str());
    assert_eq!(body["requested"], 3);
    assert_eq!(body["available"], 2);
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let app = app();
    let buyer = Caller::new("customer");
    let missing = Uuid::new_v4();
    let (status, body) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(order_body(json!([
        {"productId": missing, "quantity": 1}
    ]))))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PRODUCT_NOT_FOUND");
    assert_eq!(body["productId"], missing.to_string());
}

#[tokio::test]
async fn invalid_order_payload_is_a_validation_error() {
    let app = app();
    let buyer = Caller::new("customer");
    let (status, body) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(order_body(json!([])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(order_body(json!([
        {"productId": Uuid::new_v4(), "quantity": 0}
    ]))))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn order_body_takes_nested_payment_and_shipping() {
    let app = app();
    let seller = Caller::new("artisan");
    let buyer = Caller::new("customer");
    let a = create_product(&app, &seller, 100, 10).await;
    let mut body = order_body(json!([{"productId": a, "quantity": 1}]));
    body["payment"] = json!({"method": "card"});
    body["shipping"] = json!({"method": "express"});

    let (status, order) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["payment"]["method"], "card");
    assert_eq!(order["shippingMethod"], "express");
    assert_eq!(decimal(&order["pricing"]["shippingCost"]["amount"]), Decimal::from(500));

    // Shipping falls back to standard when omitted.
    let mut body = order_body(json!([{"productId": a, "quantity": 1}]));
    body.as_object_mut().unwrap().remove("shipping");
    let (status, order) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["shippingMethod"], "standard");
}

#[tokio::test]
async fn negative_customization_cost_is_rejected() {
    let app = app();
    let seller = Caller::new("artisan");
    let (status, body) = send(&app, "POST", "/api/v1/products", Some(&seller), Some(json!({
        "name": "Etched mug",
        "category": "ceramics",
        "price": 30,
        "quantity": 4,
        "customizationOptions": [{"name": "engraving", "additionalCost": -20}]
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let a = create_product(&app, &seller, 30, 4).await;
    let (status, body) = send(&app, "PUT", &format!("/api/v1/products/{a}"), Some(&seller), Some(json!({
        "customizationOptions": [{"name": "gift wrap", "additionalCost": -1}]
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn shipped_orders_refuse_cancellation() {
    let app = app();
    let seller = Caller::new("artisan");
    let buyer = Caller::new("customer");
    let admin = Caller::new("admin");
    let a = create_product(&app, &seller, 100, 10).await;
    let (_, order) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(order_body(json!([
        {"productId": a, "quantity": 1}
    ]))))
    .await;
    let id = order["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "PUT", &format!("/api/v1/orders/{id}/status"), Some(&admin), Some(json!({
        "status": "shipped"
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATUS_TRANSITION");

    let (status, _) = send(&app, "PUT", &format!("/api/v1/orders/{id}/payment"), Some(&buyer), Some(json!({
        "paymentStatus": "completed"
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "PUT", &format!("/api/v1/orders/{id}/status"), Some(&admin), Some(json!({
        "status": "shipped",
        "note": "Handed to courier"
    })))
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "PUT", &format!("/api/v1/orders/{id}/cancel"), Some(&buyer), Some(json!({"reason": "late"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CANNOT_CANCEL_ORDER");
    assert_eq!(body["currentStatus"], "shipped");
}

#[tokio::test]
async fn cancel_without_body_releases_stock() {
    let app = app();
    let seller = Caller::new("artisan");
    let buyer = Caller::new("customer");
    let a = create_product(&app, &seller, 100, 10).await;
    let (_, order) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(order_body(json!([
        {"productId": a, "quantity": 3}
    ]))))
    .await;
    let id = order["id"].as_str().unwrap().to_string();

    let (status, order) = send(&app, "PUT", &format!("/api/v1/orders/{id}/cancel"), Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["status"], "cancelled");
    let (_, product) = send(&app, "GET", &format!("/api/v1/products/{a}"), None, None).await;
    assert_eq!(product["reservedQuantity"], 0);
}

#[tokio::test]
async fn other_buyers_cannot_read_an_order() {
    let app = app();
    let seller = Caller::new("artisan");
    let buyer = Caller::new("customer");
    let stranger = Caller::new("customer");
    let a = create_product(&app, &seller, 100, 10).await;
    let (_, order) = send(&app, "POST", "/api/v1/orders", Some(&buyer), Some(order_body(json!([
        {"productId": a, "quantity": 1}
    ]))))
    .await;
    let id = order["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", &format!("/api/v1/orders/{id}"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCESS_DENIED");
    let (status, _) = send(&app, "GET", &format!("/api/v1/orders/{id}"), Some(&seller), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reserve_endpoint_reports_counters() {
    let app = app();
    let seller = Caller::new("artisan");
    let buyer = Caller::new("customer");
    let a = create_product(&app, &seller, 100, 10).await;

    let uri = format!("/api/v1/products/{a}/reserve");
    let (status, body) = send(&app, "POST", &uri, Some(&buyer), Some(json!({"quantity": 4}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"productId": a, "reservedQuantity": 4, "availableQuantity": 6}));

    let (status, body) = send(&app, "POST", &uri, Some(&buyer), Some(json!({"quantity": 7}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_INVENTORY");
}

#[tokio::test]
async fn deleted_products_disappear() {
    let app = app();
    let seller = Caller::new("artisan");
    let rival = Caller::new("artisan");
    let a = create_product(&app, &seller, 100, 10).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/products/{a}"), Some(&rival), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &format!("/api/v1/products/{a}"), Some(&seller), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "GET", &format!("/api/v1/products/{a}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PRODUCT_NOT_FOUND");
}

#[tokio::test]
async fn product_update_can_clear_discount() {
    let app = app();
    let seller = Caller::new("artisan");
    let a = create_product(&app, &seller, 100, 10).await;
    let uri = format!("/api/v1/products/{a}");

    let (status, body) = send(&app, "PUT", &uri, Some(&seller), Some(json!({"discountPrice": 80}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["discountPrice"]["amount"]), Decimal::from(80));

    let (status, body) = send(&app, "PUT", &uri, Some(&seller), Some(json!({"discountPrice": null, "name": "Beaded choker"}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["discountPrice"].is_null());
    assert_eq!(body["name"], "Beaded choker");
}
