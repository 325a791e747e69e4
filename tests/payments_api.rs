mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};

use common::{spawn_app, TestApp, CASHFREE_WEBHOOK_SECRET, RAZORPAY_WEBHOOK_SECRET};
use sudhaar::db::payments as db_payments;
use sudhaar::models::Gateway;
use sudhaar::services::payments::{cashfree_signature, razorpay_signature};

async fn place_order(app: &TestApp, user_id: &str, plan_id: &str, gateway: Gateway, gateway_order_id: &str, amount: i64) {
    let id = format!("order-{gateway_order_id}");
    db_payments::create_order(&app.pool, &id, user_id, plan_id, gateway, gateway_order_id, amount)
        .await
        .unwrap();
}

async fn razorpay_webhook(app: &TestApp, payload: &Value, signature: Option<String>) -> (StatusCode, Value) {
    let body = payload.to_string();
    let signature =
        signature.unwrap_or_else(|| razorpay_signature(RAZORPAY_WEBHOOK_SECRET, body.as_bytes()).unwrap());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/razorpay")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Razorpay-Signature", signature)
        .body(Body::from(body))
        .unwrap();
    let (status, bytes) = app.send(request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn cashfree_webhook(app: &TestApp, payload: &Value, secret: &str) -> (StatusCode, Value) {
    let body = payload.to_string();
    let timestamp = "1760000000000";
    let signature = cashfree_signature(secret, timestamp, body.as_bytes()).unwrap();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/cashfree")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-webhook-signature", signature)
        .header("x-webhook-timestamp", timestamp)
        .body(Body::from(body))
        .unwrap();
    let (status, bytes) = app.send(request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn razorpay_captured(order_id: &str, payment_id: &str, amount: i64) -> Value {
    json!({
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": { "id": payment_id, "order_id": order_id, "amount": amount, "status": "captured" }
            }
        }
    })
}

fn cashfree_success(order_id: &str, rupees: f64) -> Value {
    json!({
        "type": "PAYMENT_SUCCESS_WEBHOOK",
        "data": {
            "order": { "order_id": order_id, "order_amount": rupees },
            "payment": { "cf_payment_id": 5114910, "payment_status": "SUCCESS" }
        }
    })
}

async fn available_words(app: &TestApp, token: &str) -> i64 {
    let (_, body) = app.request(Method::GET, "/balance", Some(token), None).await;
    body["total_words_available"].as_i64().unwrap()
}

#[tokio::test]
async fn plans_are_public() {
    let app = spawn_app().await;
    let (status, body) = app.request(Method::GET, "/plans", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plans"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn topup_order_needs_an_active_subscription() {
    let app = spawn_app().await;
    let (_, token) = app.register("gargi").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/payments/orders",
            Some(&token),
            Some(json!({ "plan_id": "topup-5k", "gateway": "razorpay" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");
}

#[tokio::test]
async fn paid_topup_without_subscription_is_rejected_and_grants_nothing() {
    let app = spawn_app().await;
    let (user_id, token) = app.register("maitreyi").await;
    place_order(&app, &user_id, "topup-5k", Gateway::Cashfree, "cf_order_1", 9900).await;

    let (status, body) = cashfree_webhook(&app, &cashfree_success("cf_order_1", 99.0), CASHFREE_WEBHOOK_SECRET).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(available_words(&app, &token).await, 1000);

    let (_, orders) = app.request(Method::GET, "/payments/orders", Some(&token), None).await;
    assert_eq!(orders["orders"][0]["status"], "rejected");
    let (_, invoices) = app.request(Method::GET, "/invoices", Some(&token), None).await;
    assert!(invoices["invoices"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn forged_webhook_is_unauthorized() {
    let app = spawn_app().await;
    let (user_id, token) = app.register("lopamudra").await;
    place_order(&app, &user_id, "basic-monthly", Gateway::Cashfree, "cf_order_2", 19900).await;

    let (status, _) = cashfree_webhook(&app, &cashfree_success("cf_order_2", 199.0), "wrong-secret").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = razorpay_webhook(
        &app,
        &razorpay_captured("order_x", "pay_x", 19900),
        Some("00ff".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(available_words(&app, &token).await, 1000);
}

#[tokio::test]
async fn subscription_then_topup_grants_words_once_with_invoices() {
    let app = spawn_app().await;
    let (user_id, token) = app.register("aryabhata").await;
    assert_eq!(available_words(&app, &token).await, 1000);

    place_order(&app, &user_id, "basic-monthly", Gateway::Razorpay, "order_rzp_1", 19900).await;
    let captured = razorpay_captured("order_rzp_1", "pay_rzp_1", 19900);

    let (status, body) = razorpay_webhook(&app, &captured, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "fulfilled");
    assert_eq!(available_words(&app, &token).await, 11000);

    // 같은 웹훅 재전송
    let (status, body) = razorpay_webhook(&app, &captured, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "already_processed");
    assert_eq!(available_words(&app, &token).await, 11000);

    place_order(&app, &user_id, "topup-5k", Gateway::Cashfree, "cf_order_3", 9900).await;
    let (_, body) = cashfree_webhook(&app, &cashfree_success("cf_order_3", 99.0), CASHFREE_WEBHOOK_SECRET).await;
    assert_eq!(body["status"], "fulfilled");
    assert_eq!(available_words(&app, &token).await, 16000);

    let (_, balance) = app.request(Method::GET, "/balance", Some(&token), None).await;
    assert_eq!(balance["tier"], "subscribed");
    assert_eq!(balance["word_limit"], 5000);

    let (_, invoices) = app.request(Method::GET, "/invoices", Some(&token), None).await;
    let invoices = invoices["invoices"].as_array().unwrap();
    assert_eq!(invoices.len(), 2);
    let subscription_invoice = invoices
        .iter()
        .find(|i| i["total_paise"] == 19900)
        .unwrap();
    assert_eq!(subscription_invoice["base_paise"], 16864);
    assert_eq!(subscription_invoice["cgst_paise"], 1518);
    assert_eq!(subscription_invoice["sgst_paise"], 1518);

    let invoice_id = subscription_invoice["id"].as_str().unwrap();
    let request = Request::builder()
        .uri(format!("/invoices/{invoice_id}/pdf"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, bytes) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn amount_mismatch_fails_the_order() {
    let app = spawn_app().await;
    let (user_id, token) = app.register("bhaskara").await;
    place_order(&app, &user_id, "basic-monthly", Gateway::Razorpay, "order_rzp_2", 19900).await;

    let (_, body) = razorpay_webhook(&app, &razorpay_captured("order_rzp_2", "pay_rzp_2", 100), None).await;

    assert_eq!(body["status"], "rejected");
    assert_eq!(available_words(&app, &token).await, 1000);
    let (_, orders) = app.request(Method::GET, "/payments/orders", Some(&token), None).await;
    assert_eq!(orders["orders"][0]["status"], "failed");
}

#[tokio::test]
async fn unrelated_events_are_acknowledged() {
    let app = spawn_app().await;
    let (status, body) = razorpay_webhook(&app, &json!({ "event": "refund.created" }), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn cashfree_events_without_an_order_are_acknowledged() {
    let app = spawn_app().await;
    let refund = json!({
        "type": "REFUND_STATUS_WEBHOOK",
        "data": {
            "refund": { "cf_refund_id": 1929, "refund_status": "SUCCESS", "refund_amount": 99.0 }
        }
    });
    let (status, body) = cashfree_webhook(&app, &refund, CASHFREE_WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "ignored");

    let (status, body) = cashfree_webhook(&app, &json!({ "type": "SETTLEMENT_WEBHOOK" }), CASHFREE_WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn cashfree_payment_success_without_an_order_is_a_bad_request() {
    let app = spawn_app().await;
    let payload = json!({ "type": "PAYMENT_SUCCESS_WEBHOOK", "data": { "payment": { "cf_payment_id": 1 } } });
    let (status, _) = cashfree_webhook(&app, &payload, CASHFREE_WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
