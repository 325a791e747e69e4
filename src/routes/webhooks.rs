//! # 결제 게이트웨이 웹훅
//!
//! - `POST /api/v1/webhooks/razorpay` (`X-Razorpay-Signature`)
//! - `POST /api/v1/webhooks/cashfree` (`x-webhook-signature`, `x-webhook-timestamp`)
//!
//! 서명은 원본 바이트로 검증하므로 본문을 `Bytes`로 받아 검증 후에 파싱합니다.
//! (`Json<T>` 추출기를 쓰면 파싱 후 재직렬화된 값밖에 남지 않아 서명이 맞지 않습니다.)
//! 본문을 소비하는 추출기(`Bytes`)는 axum 규칙상 핸들러의 마지막 인자여야 합니다.
//! 서명이 맞지 않으면 401, 처리하지 않는 이벤트는 200으로 무시합니다.
//! 같은 웹훅이 다시 와도 주문 상태가 `created`가 아니면 아무것도 하지 않습니다.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::*,
    routes::AppState,
    services::billing::{fulfil_order, FulfilmentOutcome, PaymentNotice},
};

const RAZORPAY_SIGNATURE: &str = "x-razorpay-signature";
const CASHFREE_SIGNATURE: &str = "x-webhook-signature";
const CASHFREE_TIMESTAMP: &str = "x-webhook-timestamp";

const RAZORPAY_PAID_EVENTS: [&str; 2] = ["payment.captured", "order.paid"];

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// `POST /webhooks/razorpay`
pub async fn razorpay(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = header(&headers, RAZORPAY_SIGNATURE)
        .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;
    state
        .gateways
        .get(Gateway::Razorpay)?
        .verify_webhook(&body, signature, None)?;

    let event: RazorpayWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid Razorpay payload: {e}")))?;
    if !RAZORPAY_PAID_EVENTS.contains(&event.event.as_str()) {
        tracing::debug!(event = %event.event, "Ignoring Razorpay event");
        return Ok(Json(WebhookResponse { status: "ignored" }));
    }

    let payment = event.payload.payment.as_ref().map(|w| &w.entity);
    let gateway_order_id = payment
        .and_then(|p| p.order_id.as_deref())
        .or_else(|| event.payload.order.as_ref().map(|w| w.entity.id.as_str()))
        .ok_or_else(|| AppError::BadRequest("Razorpay payload has no order id".to_string()))?;

    let notice = PaymentNotice {
        gateway: Gateway::Razorpay,
        gateway_order_id,
        gateway_payment_id: payment.map(|p| p.id.as_str()),
        amount_paise: payment.and_then(|p| p.amount),
    };
    settle(&state, &notice).await
}

/// `POST /webhooks/cashfree`
pub async fn cashfree(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = header(&headers, CASHFREE_SIGNATURE)
        .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;
    state
        .gateways
        .get(Gateway::Cashfree)?
        .verify_webhook(&body, signature, header(&headers, CASHFREE_TIMESTAMP))?;

    let event: CashfreeWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid Cashfree payload: {e}")))?;
    if event.event_type != CASHFREE_PAYMENT_SUCCESS {
        tracing::debug!(event = %event.event_type, "Ignoring Cashfree event");
        return Ok(Json(WebhookResponse { status: "ignored" }));
    }

    let order = event
        .data
        .order
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Cashfree payment event has no order".to_string()))?;
    let payment_id = event.data.payment.as_ref().and_then(|p| p.payment_id());
    let notice = PaymentNotice {
        gateway: Gateway::Cashfree,
        gateway_order_id: &order.order_id,
        gateway_payment_id: payment_id.as_deref(),
        // 루피 단위 소수 → 파이사
        amount_paise: order.order_amount.map(|rupees| (rupees * 100.0).round() as i64),
    };
    settle(&state, &notice).await
}

async fn settle(state: &AppState, notice: &PaymentNotice<'_>) -> Result<Json<WebhookResponse>, AppError> {
    let status = match fulfil_order(&state.pool, notice).await? {
        FulfilmentOutcome::Fulfilled { order_id, user_id, invoice_id } => {
            state.ledger.invalidate(&user_id);
            tracing::info!(%order_id, %user_id, %invoice_id, "Order fulfilled");
            "fulfilled"
        }
        FulfilmentOutcome::Rejected { user_id, .. } => {
            state.ledger.invalidate(&user_id);
            "rejected"
        }
        FulfilmentOutcome::AlreadyProcessed { order_id } => {
            tracing::debug!(%order_id, "Duplicate webhook");
            "already_processed"
        }
        FulfilmentOutcome::UnknownOrder => "unknown_order",
    };
    Ok(Json(WebhookResponse { status }))
}
