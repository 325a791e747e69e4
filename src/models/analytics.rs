//! # 관리자 분석(Analytics) 모델
//!
//! 관리자 대시보드와 보고서 내보내기에서 쓰는 집계 결과 구조체입니다.
//! 모두 읽기 전용이며 요청마다 DB에서 다시 계산합니다.

use serde::{Deserialize, Serialize};

/// `get_admin_analytics_summary()`의 결과
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalyticsSummary {
    pub total_users: i64,
    pub admin_users: i64,
    pub active_subscriptions: i64,
    pub paid_orders: i64,
    pub total_revenue_paise: i64,
    pub revenue_this_month_paise: i64,
    pub total_corrections: i64,
    pub total_words_processed: i64,
}

/// 월별 매출 (`month`는 "YYYY-MM")
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonthlyRevenue {
    pub month: String,
    pub orders: i64,
    pub revenue_paise: i64,
}

/// 처리 모드별 교정 건수
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CorrectionTypeCount {
    pub processing_type: String,
    pub corrections: i64,
    pub words_used: i64,
}

/// 관리자 사용자 목록의 한 행 (잔액 포함)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminUserRow {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub words_available: i64,
    pub total_corrections: i64,
    pub created_at: String,
}

/// 교정 보고서의 한 행 (원문은 잘라서 싣습니다)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CorrectionReportRow {
    pub id: String,
    pub username: String,
    pub processing_type: String,
    pub words_used: i64,
    pub text_sample: String,
    pub created_at: String,
}

/// 보고서 종류 (`GET /admin/reports/{kind}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Users,
    Invoices,
    Corrections,
    Revenue,
}

/// 내보내기 형식 (`?format=csv|json|pdf`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[default]
    Json,
    Pdf,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// `PATCH /admin/users/{id}/role` 요청 본문
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}
