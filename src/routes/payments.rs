//! # 결제 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET  /api/v1/plans`              → 판매 중인 요금제 (인증 불필요)
//! - `POST /api/v1/payments/orders`    → 게이트웨이 주문 생성
//! - `GET  /api/v1/payments/orders`    → 내 주문 목록
//! - `GET  /api/v1/invoices`           → 내 인보이스 목록
//! - `GET  /api/v1/invoices/{id}/pdf`  → 인보이스 PDF (본인 또는 관리자)
//!
//! 충전 요금제는 활성 구독이 있어야 주문할 수 있습니다.
//! 결제 완료 시점에도 웹훅에서 한 번 더 확인합니다.

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use serde::Serialize;

use crate::{
    db::{ledger as db_ledger, payments as db_payments, users as db_users},
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::{download, AppState},
    services::{
        export::{invoice_pdf as render_invoice, ExportFile},
        payments::OrderRequest,
    },
};

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<Plan>,
}

pub async fn list_plans(State(state): State<AppState>) -> Result<Json<PlansResponse>, AppError> {
    Ok(Json(PlansResponse {
        plans: db_payments::list_plans(&state.pool).await?,
    }))
}

/// `POST /payments/orders`
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let plan = {
        let mut conn = state.pool.acquire().await?;
        db_payments::get_plan(&mut conn, &req.plan_id).await?
    }
    .filter(|plan| plan.is_active != 0)
    .ok_or(AppError::NotFound)?;

    if plan.plan_type == PlanType::Topup
        && !db_ledger::check_user_has_active_subscription(&state.pool, &auth_user.user_id).await?
    {
        return Err(AppError::Forbidden(
            "Top-up plans require an active subscription".to_string(),
        ));
    }

    let gateway = state.gateways.get(req.gateway)?;
    let user = db_users::find_by_id(&state.pool, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let order_id = uuid::Uuid::now_v7().to_string();
    let gateway_order = gateway
        .create_order(&OrderRequest {
            order_id: order_id.clone(),
            amount_paise: plan.price_paise,
            customer_id: user.id.clone(),
            customer_email: user.email.clone(),
            customer_phone: req.customer_phone.clone(),
        })
        .await?;

    let order = db_payments::create_order(
        &state.pool,
        &order_id,
        &user.id,
        &plan.id,
        req.gateway,
        &gateway_order.gateway_order_id,
        plan.price_paise,
    )
    .await?;

    tracing::info!(
        order_id = %order.id,
        gateway = gateway.gateway().as_str(),
        plan = %plan.id,
        "Payment order created"
    );

    Ok(Json(CreateOrderResponse {
        order_id: order.id,
        gateway: order.gateway,
        gateway_order_id: order.gateway_order_id,
        amount_paise: order.amount_paise,
        checkout_token: gateway_order.checkout_token,
    }))
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<PaymentOrder>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<OrdersResponse>, AppError> {
    Ok(Json(OrdersResponse {
        orders: db_payments::list_orders(&state.pool, &auth_user.user_id).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct InvoicesResponse {
    pub invoices: Vec<Invoice>,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<InvoicesResponse>, AppError> {
    Ok(Json(InvoicesResponse {
        invoices: db_payments::list_invoices(&state.pool, &auth_user.user_id).await?,
    }))
}

/// `GET /invoices/{id}/pdf`
pub async fn invoice_pdf(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let invoice = db_payments::get_invoice(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if invoice.user_id != auth_user.user_id {
        let requester = db_users::find_by_id(&state.pool, &auth_user.user_id).await?;
        if !requester.is_some_and(|u| u.is_admin()) {
            return Err(AppError::NotFound);
        }
    }

    let customer = db_users::find_by_id(&state.pool, &invoice.user_id)
        .await?
        .map(|u| u.email.unwrap_or(u.username))
        .unwrap_or_default();

    let bytes = render_invoice(&invoice, &state.company, &customer)?;
    Ok(download(ExportFile {
        content_type: "application/pdf",
        filename: format!("{}.pdf", invoice.invoice_number),
        bytes,
    }))
}
