//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들과 공유 상태(`AppState`), API 라우터를 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `account`: 잔액, 사용 통계, 구독, 크레딧 조회
//! - `admin`: 관리자 분석, 사용자 관리, 보고서 내보내기
//! - `auth`: 인증 관련 (회원가입, 로그인, 토큰 갱신, 로그아웃)
//! - `corrections`: 문법/문체 교정, 하이라이트, 교정 이력
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `payments`: 요금제, 주문 생성, 인보이스
//! - `webhooks`: 결제 게이트웨이 웹훅

pub mod account;
pub mod admin;
pub mod auth;
pub mod corrections;
pub mod health;
pub mod payments;
pub mod webhooks;

use std::sync::Arc;

use axum::{
    http::header,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use sqlx::SqlitePool;

use crate::config::{CompanyInfo, Config};
use crate::services::{
    cache::ResponseCache,
    dictionary::WordDictionary,
    export::ExportFile,
    inflight::InFlight,
    ledger::CreditLedger,
    llm::{CompletionParams, LlmCorrector, LlmError, ProviderChain},
    payments::{Gateways, PaymentError},
    pipeline::CorrectionPipeline,
};

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 필드는 모두 내부적으로 Arc를 써서 clone이 저렴합니다.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// JWT 토큰 서명용 비밀키
    pub jwt_secret: String,
    pub company: CompanyInfo,
    pub pipeline: CorrectionPipeline,
    pub ledger: CreditLedger,
    pub cache: ResponseCache,
    pub inflight: InFlight,
    pub gateways: Gateways,
}

/// 상태 구성 중 발생하는 에러
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl AppState {
    /// 설정에서 LLM 제공자 체인, 파이프라인, 결제 게이트웨이를 만듭니다.
    pub fn from_config(pool: SqlitePool, config: &Config) -> Result<Self, StateError> {
        let chain = ProviderChain::from_settings(&config.llm)?;
        if chain.is_empty() {
            tracing::warn!("No LLM provider configured, correction requests will fail");
        } else {
            tracing::info!(providers = chain.len(), "LLM provider chain ready");
        }

        let corrector = LlmCorrector::new(
            Arc::new(chain),
            CompletionParams {
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            },
        );
        let pipeline = CorrectionPipeline::new(Arc::new(WordDictionary::builtin()), corrector);
        let gateways = Gateways::from_config(config.razorpay.clone(), config.cashfree.clone())?;

        Ok(Self {
            ledger: CreditLedger::new(pool.clone(), config.words, config.cache_ttl),
            pool,
            jwt_secret: config.jwt_secret.clone(),
            company: config.company.clone(),
            pipeline,
            cache: ResponseCache::new(config.cache_ttl),
            inflight: InFlight::default(),
            gateways,
        })
    }
}

/// `/api/v1` 아래에 붙는 API 라우터
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me));

    let correction_routes = Router::new()
        .route("/correct/grammar", post(corrections::correct_grammar))
        .route("/correct/style", post(corrections::correct_style))
        .route("/highlight", post(corrections::highlight))
        .route("/corrections", get(corrections::list_corrections))
        .route(
            "/corrections/{id}",
            get(corrections::get_correction).delete(corrections::delete_correction),
        );

    let account_routes = Router::new()
        .route("/balance", get(account::balance))
        .route("/stats", get(account::stats))
        .route("/subscription", get(account::subscription))
        .route("/credits", get(account::credits));

    let payment_routes = Router::new()
        .route("/plans", get(payments::list_plans))
        .route("/payments/orders", get(payments::list_orders).post(payments::create_order))
        .route("/invoices", get(payments::list_invoices))
        .route("/invoices/{id}/pdf", get(payments::invoice_pdf))
        .route("/webhooks/razorpay", post(webhooks::razorpay))
        .route("/webhooks/cashfree", post(webhooks::cashfree));

    let admin_routes = Router::new()
        .route("/admin/analytics/summary", get(admin::summary))
        .route("/admin/analytics/revenue", get(admin::revenue))
        .route("/admin/analytics/corrections", get(admin::corrections_by_type))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/role", patch(admin::update_role))
        .route("/admin/reports/{kind}", get(admin::export_report));

    Router::new()
        .merge(auth_routes)
        .merge(correction_routes)
        .merge(account_routes)
        .merge(payment_routes)
        .merge(admin_routes)
        .route("/health", get(health::health_check))
        .with_state(state)
}

/// 내보낸 파일을 첨부 파일 응답으로 바꿉니다.
pub fn download(file: ExportFile) -> Response {
    (
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    )
        .into_response()
}
