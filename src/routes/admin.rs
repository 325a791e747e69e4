//! # 관리자 라우트 핸들러
//!
//! 모든 핸들러는 `AdminUser` 추출기를 거치므로 일반 사용자는 403을 받습니다.
//!
//! ## 엔드포인트
//! - `GET   /api/v1/admin/analytics/summary`      → 전체 요약
//! - `GET   /api/v1/admin/analytics/revenue`      → 월별 매출
//! - `GET   /api/v1/admin/analytics/corrections`  → 모드별 교정 건수
//! - `GET   /api/v1/admin/users`                  → 사용자 목록 (잔액 포함)
//! - `PATCH /api/v1/admin/users/{id}/role`        → 역할 변경
//! - `GET   /api/v1/admin/reports/{kind}?format=` → 보고서 내보내기 (csv, json, pdf)

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Serialize;

use crate::{
    db::{analytics as db_analytics, payments as db_payments, users as db_users},
    error::AppError,
    middleware::auth::AdminUser,
    models::*,
    routes::{download, AppState},
    services::export::render,
};

/// 교정 보고서에 싣는 최대 행 수
const CORRECTION_REPORT_ROWS: i64 = 1000;

pub async fn summary(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<AnalyticsSummary>, AppError> {
    Ok(Json(db_analytics::get_admin_analytics_summary(&state.pool).await?))
}

#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub months: Vec<MonthlyRevenue>,
}

pub async fn revenue(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<RevenueResponse>, AppError> {
    Ok(Json(RevenueResponse {
        months: db_analytics::revenue_by_month(&state.pool).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct CorrectionTypesResponse {
    pub types: Vec<CorrectionTypeCount>,
}

pub async fn corrections_by_type(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<CorrectionTypesResponse>, AppError> {
    Ok(Json(CorrectionTypesResponse {
        types: db_analytics::corrections_by_type(&state.pool).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<AdminUserRow>,
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<UsersResponse>, AppError> {
    Ok(Json(UsersResponse {
        users: db_analytics::list_users_with_stats(&state.pool).await?,
    }))
}

/// `PATCH /admin/users/{id}/role`
pub async fn update_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let role = req.role.trim();
    if role != ROLE_USER && role != ROLE_ADMIN {
        return Err(AppError::Validation(format!(
            "Role must be '{ROLE_USER}' or '{ROLE_ADMIN}'"
        )));
    }
    // 자기 자신의 관리자 권한은 해제할 수 없음
    if id == admin.user_id && role != ROLE_ADMIN {
        return Err(AppError::BadRequest("Cannot remove your own admin role".to_string()));
    }

    let user = db_users::set_role(&state.pool, &id, role)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(admin_id = %admin.user_id, user_id = %user.id, role, "User role changed");
    Ok(Json(user.into()))
}

/// `GET /admin/reports/{kind}?format=csv|json|pdf`
pub async fn export_report(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(kind): Path<ReportKind>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let file = match kind {
        ReportKind::Users => {
            let rows = db_analytics::list_users_with_stats(&state.pool).await?;
            render("users", "Users", &rows, query.format)?
        }
        ReportKind::Invoices => {
            let rows = db_payments::list_all_invoices(&state.pool).await?;
            render("invoices", "Invoices", &rows, query.format)?
        }
        ReportKind::Corrections => {
            let rows = db_analytics::correction_report(&state.pool, CORRECTION_REPORT_ROWS).await?;
            render("corrections", "Corrections", &rows, query.format)?
        }
        ReportKind::Revenue => {
            let rows = db_analytics::revenue_by_month(&state.pool).await?;
            render("revenue", "Monthly revenue", &rows, query.format)?
        }
    };
    Ok(download(file))
}
