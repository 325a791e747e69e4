//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라우트 핸들러(routes/)와 서비스(services/)에서 이 모듈의 함수를 호출합니다.
//!
//! 각 하위 모듈:
//! - `analytics`: 관리자 대시보드 집계와 보고서 쿼리
//! - `corrections`: 교정 이력 저장/조회/삭제
//! - `ledger`: 단어 크레딧 잔액, 차감, 구독
//! - `payments`: 요금제, 결제 주문, 인보이스
//! - `users`: 사용자 인증 관련 쿼리

pub mod analytics;
pub mod corrections;
pub mod ledger;
pub mod payments;
pub mod users;

use chrono::{Duration, Utc};

use crate::error::AppError;

/// DB 타임스탬프 형식. 문자열 비교가 곧 시간 순서 비교입니다.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn now_iso() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// 지금부터 `days`일 뒤의 타임스탬프
///
/// `days`는 설정값(`FREE_CREDIT_VALIDITY_DAYS`)이나 `plans.validity_days`에서 오므로
/// chrono가 표현할 수 없는 범위면 패닉 대신 에러를 돌려줍니다.
pub fn iso_after_days(days: i64) -> Result<String, AppError> {
    Duration::try_days(days)
        .and_then(|validity| Utc::now().checked_add_signed(validity))
        .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
        .ok_or_else(|| AppError::Internal(format!("Validity of {days} days is out of range")))
}

/// 마이그레이션이 적용된 인메모리 DB (단위 테스트용)
#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
