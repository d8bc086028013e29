// tests/payments.rs
//
// Razorpay and PayPal proxy routes against local mock gateways.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get as get_route, post as post_route},
    Json, Router,
};
use serde_json::{json, Value};

use agri_market_gateway::config::AppConfig;
use agri_market_gateway::payments::paypal::PaypalCredentials;
use agri_market_gateway::payments::razorpay::{expected_signature, RazorpayCredentials};
use common::{dead_feeds, fixed_clock, get, post_json, router_with, spawn_upstream, test_config};

const KEY_SECRET: &str = "rzp_secret_for_tests";

// ---------- Razorpay mock ----------

async fn rzp_create_order(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "id": "order_TEST",
        "entity": "order",
        "amount": body["amount"],
        "currency": body["currency"],
        "receipt": body["receipt"],
        "status": "created",
    }))
}

async fn rzp_get_order(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "order_TEST" {
        (
            StatusCode::OK,
            Json(json!({"id": "order_TEST", "amount": 1999, "currency": "INR", "status": "paid",
                        "receipt": "order_20250605_083000_abcdef"})),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": "BAD_REQUEST_ERROR",
                                  "description": "The id provided does not exist"}})),
        )
    }
}

async fn rzp_get_payment(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "pay_TEST" {
        (
            StatusCode::OK,
            Json(json!({"id": "pay_TEST", "amount": 1999, "currency": "INR", "status": "captured",
                        "method": "upi", "created_at": 1749112200, "captured": true,
                        "order_id": "order_TEST"})),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"description": "The id provided does not exist"}})),
        )
    }
}

async fn razorpay_config() -> AppConfig {
    let app = Router::new()
        .route("/v1/orders", post_route(rzp_create_order))
        .route("/v1/orders/{id}", get_route(rzp_get_order))
        .route("/v1/payments/{id}", get_route(rzp_get_payment));
    let base = spawn_upstream(app).await;
    AppConfig {
        razorpay: Some(RazorpayCredentials {
            key_id: "rzp_test_key".into(),
            key_secret: KEY_SECRET.into(),
        }),
        razorpay_api_base: base,
        ..test_config()
    }
}

#[tokio::test]
async fn razorpay_order_is_created_in_paise() {
    let app = router_with(&razorpay_config().await, &dead_feeds(), fixed_clock());
    let (status, v) = post_json(
        &app,
        "/create-razorpay-order",
        json!({"amount": 19.99, "customer_name": "Asha", "customer_email": "asha@example.com",
               "customer_phone": "9999999999"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["status"], "success");
    assert_eq!(v["order"]["id"], "order_TEST");
    assert_eq!(v["order"]["amount"], 1999);
    assert_eq!(v["order"]["currency"], "INR");
    assert!(v["order"]["receipt"].as_str().unwrap().starts_with("order_20250605_083000_"));
    assert_eq!(v["key_id"], "rzp_test_key");
    assert_eq!(v["customer_details"]["contact"], "9999999999");
}

#[tokio::test]
async fn razorpay_rejects_non_positive_amounts() {
    let app = router_with(&razorpay_config().await, &dead_feeds(), fixed_clock());
    for amount in [json!(0), json!(-5.0)] {
        let (status, v) = post_json(&app, "/create-razorpay-order", json!({ "amount": amount })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(v["detail"].as_str().unwrap().contains("greater than zero"));
    }
}

#[tokio::test]
async fn unconfigured_gateways_are_server_errors() {
    let app = router_with(&test_config(), &dead_feeds(), fixed_clock());

    let (status, v) = post_json(&app, "/create-razorpay-order", json!({"amount": 10})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["detail"].as_str().unwrap().contains("not configured"));

    let (status, _) = post_json(&app, "/create-paypal-order", json!({"amount": 10})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = get(&app, "/razorpay-order/order_TEST").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn razorpay_signature_verification() {
    let app = router_with(&razorpay_config().await, &dead_feeds(), fixed_clock());

    let (status, v) = post_json(
        &app,
        "/verify-razorpay-payment",
        json!({"razorpay_payment_id": "pay_TEST", "razorpay_order_id": "order_TEST",
               "razorpay_signature": "00".repeat(32)}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["detail"], "Invalid payment signature");

    let sig = expected_signature(KEY_SECRET, "order_TEST", "pay_TEST").unwrap();
    let (status, v) = post_json(
        &app,
        "/verify-razorpay-payment",
        json!({"razorpay_payment_id": "pay_TEST", "razorpay_order_id": "order_TEST",
               "razorpay_signature": sig}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["message"], "Payment verified successfully");
    assert_eq!(v["payment"]["status"], "captured");
    assert_eq!(v["order"]["status"], "paid");
    assert_eq!(v["timestamp"], "2025-06-05T08:30:00.000Z");
}

#[tokio::test]
async fn razorpay_order_lookup() {
    let app = router_with(&razorpay_config().await, &dead_feeds(), fixed_clock());

    let (status, v) = get(&app, "/razorpay-order/order_TEST").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["order"]["status"], "paid");

    let (status, v) = get(&app, "/razorpay-order/order_MISSING").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let detail = v["detail"].as_str().unwrap();
    assert!(detail.starts_with("Order not found"), "{detail}");
    assert!(detail.contains("The id provided does not exist"), "{detail}");
}

#[tokio::test]
async fn payment_status_by_gateway() {
    let app = router_with(&razorpay_config().await, &dead_feeds(), fixed_clock());

    let (status, v) = get(&app, "/payment-status/pay_TEST").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["gateway"], "razorpay");
    assert_eq!(v["status"], "captured");
    assert_eq!(v["method"], "upi");
    assert_eq!(v["order_id"], "order_TEST");

    let (status, v) = get(&app, "/payment-status/pay_TEST?gateway=stripe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["detail"], "Invalid payment gateway specified");

    let (status, _) = get(&app, "/payment-status/pay_NOPE?gateway=razorpay").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------- PayPal mock ----------

#[derive(Clone, Default)]
struct TokenCalls(Arc<AtomicUsize>);

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h == "Bearer A21_TEST_TOKEN")
}

async fn pp_token(State(calls): State<TokenCalls>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    calls.0.fetch_add(1, Ordering::SeqCst);
    let basic = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h.starts_with("Basic "));
    if !basic {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"})));
    }
    (
        StatusCode::OK,
        Json(json!({"access_token": "A21_TEST_TOKEN", "token_type": "Bearer", "expires_in": 32400})),
    )
}

async fn pp_create(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Authentication failed"})));
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "PAYID-TEST",
            "intent": body["intent"],
            "state": "created",
            "transactions": body["transactions"],
            "links": [
                {"href": "https://sandbox.example/v1/payments/payment/PAYID-TEST", "rel": "self", "method": "GET"},
                {"href": "https://sandbox.example/checkoutnow?token=EC-1", "rel": "approval_url", "method": "REDIRECT"}
            ]
        })),
    )
}

fn executed_payment() -> Value {
    json!({
        "id": "PAYID-TEST",
        "intent": "sale",
        "state": "approved",
        "create_time": "2025-06-05T08:29:00Z",
        "payer": {"payment_method": "paypal", "payer_info": {"email": "buyer@example.com", "payer_id": "PAYER1"}},
        "transactions": [{
            "amount": {"total": "25.00", "currency": "USD"},
            "description": "Rice Sample Purchase",
            "invoice_number": "INV-20250605-abcdef12",
            "related_resources": [{"sale": {"id": "SALE-1", "state": "completed",
                                            "amount": {"total": "25.00", "currency": "USD"}}}]
        }]
    })
}

async fn pp_execute(
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) || body["payer_id"] != "PAYER1" {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "Payer ID is invalid"})));
    }
    assert_eq!(id, "PAYID-TEST");
    (StatusCode::OK, Json(executed_payment()))
}

async fn pp_find(headers: HeaderMap, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if authorized(&headers) && id == "PAYID-TEST" {
        (StatusCode::OK, Json(executed_payment()))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"name": "INVALID_RESOURCE_ID", "message": "Requested resource ID was not found."})),
        )
    }
}

async fn paypal_config(calls: TokenCalls) -> AppConfig {
    let app = Router::new()
        .route("/v1/oauth2/token", post_route(pp_token))
        .route("/v1/payments/payment", post_route(pp_create))
        .route("/v1/payments/payment/{id}", get_route(pp_find))
        .route("/v1/payments/payment/{id}/execute", post_route(pp_execute))
        .with_state(calls);
    let base = spawn_upstream(app).await;
    AppConfig {
        paypal: Some(PaypalCredentials {
            client_id: "pp_client".into(),
            client_secret: "pp_secret".into(),
        }),
        paypal_api_base: Some(base),
        ..test_config()
    }
}

#[tokio::test]
async fn paypal_create_reuses_cached_token() {
    let calls = TokenCalls::default();
    let app = router_with(&paypal_config(calls.clone()).await, &dead_feeds(), fixed_clock());

    for _ in 0..2 {
        let (status, v) = post_json(
            &app,
            "/create-paypal-order",
            json!({"amount": 25, "customer_name": "Asha", "customer_email": "asha@example.com"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{v}");
        assert_eq!(v["payment_id"], "PAYID-TEST");
        assert_eq!(v["approval_url"], "https://sandbox.example/checkoutnow?token=EC-1");
        assert_eq!(v["currency"], "USD");
        assert_eq!(v["customer_details"]["email"], "asha@example.com");
    }
    assert_eq!(calls.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn paypal_execute_returns_sale_summary() {
    let app = router_with(&paypal_config(TokenCalls::default()).await, &dead_feeds(), fixed_clock());

    let (status, v) = post_json(
        &app,
        "/execute-paypal-payment",
        json!({"payment_id": "PAYID-TEST", "payer_id": "PAYER1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["message"], "Payment executed successfully");
    assert_eq!(v["payment"]["state"], "approved");
    assert_eq!(v["transaction"]["amount"], "25.00");
    assert_eq!(v["sale"]["id"], "SALE-1");
    assert_eq!(v["sale"]["state"], "completed");
    assert_eq!(v["payer"]["payer_info"]["email"], "buyer@example.com");

    let (status, v) = post_json(
        &app,
        "/execute-paypal-payment",
        json!({"payment_id": "PAYID-TEST", "payer_id": "WRONG"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = v["detail"].as_str().unwrap();
    assert!(detail.starts_with("PayPal payment execution failed"), "{detail}");
    assert!(detail.contains("Payer ID is invalid"), "{detail}");
}

#[tokio::test]
async fn paypal_lookups() {
    let app = router_with(&paypal_config(TokenCalls::default()).await, &dead_feeds(), fixed_clock());

    let (status, v) = get(&app, "/paypal-payment/PAYID-TEST").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["payment"]["state"], "approved");
    assert_eq!(v["payment"]["transactions"][0]["amount"]["total"], "25.00");

    let (status, v) = get(&app, "/payment-status/PAYID-TEST?gateway=PayPal").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["gateway"], "paypal");
    assert_eq!(v["status"], "approved");

    let (status, v) = get(&app, "/paypal-payment/PAYID-NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(v["detail"].as_str().unwrap().starts_with("Payment not found"));
}
