//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//! Rust에서는 예외(exception) 대신 `Result<T, E>` 타입으로 에러를 처리합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 모든 에러 종류를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환
//! - 서비스 계층 에러(`LlmError`, `PipelineError`, `PaymentError`, `ExportError`, `TaskError`)에서
//!   `AppError`로의 `From` 변환
//!
//! ## 에러 분류
//! | 분류 | 변형 | 상태 코드 |
//! |------|------|-----------|
//! | 검증 에러 (빈 입력, 형식 오류) | `Validation`, `BadRequest` | 400 |
//! | 단어 수 상한 초과 | `WordLimitExceeded` | 413 |
//! | 잔액 부족 | `InsufficientBalance` | 402 |
//! | LLM 제공자/결제 게이트웨이 실패 | `Provider` | 502 |
//! | 같은 사용자의 새 요청에 밀려난 교정 | `Conflict` | 409 |
//! | 내부/DB/IO | `Internal`, `Database`, `Io` | 500 |

use axum::{
    http::StatusCode,                     // HTTP 상태 코드 (200, 404, 500 등)
    response::{IntoResponse, Response},   // Axum의 응답 변환 트레이트
    Json,                                 // JSON 응답 래퍼
};
use serde_json::json; // json! 매크로: JSON 객체를 간편하게 생성
use thiserror::Error; // thiserror: 커스텀 에러 타입을 쉽게 만들어주는 매크로 크레이트

use crate::services::{
    export::ExportError, inflight::TaskError, llm::LlmError, payments::PaymentError,
    pipeline::PipelineError,
};

/// 잔액 부족 시 안내할 구매 페이지 경로
pub const PURCHASE_PATH: &str = "/pricing";

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 각 에러 variant는 적절한 HTTP 상태 코드와 메시지로 변환됩니다.
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스를 찾을 수 없음 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 잘못된 요청 (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 입력 검증 실패 (HTTP 400). 네트워크 호출 전에 걸러집니다
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 1회 교정 단어 상한 초과 (HTTP 413)
    #[error("Text has {word_count} words, the limit is {limit}")]
    WordLimitExceeded { word_count: usize, limit: usize },

    /// 단어 잔액 부족 (HTTP 402)
    #[error("Insufficient word balance: {required} required, {available} available")]
    InsufficientBalance { required: i64, available: i64 },

    /// 외부 LLM 제공자 실패 (HTTP 502)
    #[error("Provider error: {0}")]
    Provider(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: sqlx::Error를 AppError로 자동 변환하는 From 트레이트를 구현합니다.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 파일 입출력 오류 (HTTP 500)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 권한 없음 (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 리소스 충돌 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Database, IO, Internal)와 제공자 에러는 실제 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone())
            }
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AppError::WordLimitExceeded { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "word_limit_exceeded",
                self.to_string(),
            ),
            AppError::InsufficientBalance { .. } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_balance",
                // 구매 페이지로 안내하는 실행 가능한 메시지
                format!("{}. Buy more words at {}", self, PURCHASE_PATH),
            ),
            AppError::Provider(ref msg) => {
                tracing::error!("Provider error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "provider_error",
                    "The correction service is temporarily unavailable, please retry".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                // 내부 에러는 로그에 기록 (서버 관리자용)
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "An IO error occurred".to_string(),
                )
            }
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::Conflict(ref msg) => {
                (StatusCode::CONFLICT, "conflict", msg.clone())
            }
        };

        // 결과: { "error": { "code": "not_found", "message": "Resource not found" } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

// ── 서비스 계층 에러 → AppError 변환 ──
// `?` 연산자가 핸들러 안에서 서비스 에러를 자동으로 AppError로 바꿀 수 있게 합니다.

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(msg) => AppError::Internal(msg),
            other => AppError::Provider(other.to_string()),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyInput => AppError::Validation("Text must not be empty".to_string()),
            PipelineError::WordLimitExceeded { word_count, limit } => {
                AppError::WordLimitExceeded { word_count, limit }
            }
            PipelineError::Llm(e) => e.into(),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature => {
                AppError::Unauthorized("Invalid webhook signature".to_string())
            }
            PaymentError::InvalidPayload(msg) => AppError::BadRequest(msg),
            PaymentError::NotConfigured(gateway) => {
                AppError::BadRequest(format!("Payment gateway {} is not configured", gateway))
            }
            other @ (PaymentError::Http(_) | PaymentError::Gateway { .. }) => {
                AppError::Provider(other.to_string())
            }
        }
    }
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Superseded => {
                AppError::Conflict("Superseded by a newer correction request".to_string())
            }
            TaskError::Failed(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Internal(err.to_string())
    }
}
