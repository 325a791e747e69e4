//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `analytics`: 관리자 대시보드 집계와 보고서 형식
//! - `correction`: 교정 기록, 하이라이트 세그먼트, 교정 이력
//! - `ledger`: 단어 잔액, 크레딧 배치, 구독, 요금제
//! - `payment`: 결제 주문, 인보이스, 게이트웨이 웹훅 페이로드
//! - `user`: 사용자(User) 관련 구조체
//!
//! `pub use X::*;`는 하위 모듈의 모든 공개 항목을 재공개(re-export)합니다.
//! 예: `crate::models::correction::Correction` 대신 `crate::models::Correction`으로 접근 가능

pub mod analytics;
pub mod correction;
pub mod ledger;
pub mod payment;
pub mod user;

pub use analytics::*;
pub use correction::*;
pub use ledger::*;
pub use payment::*;
pub use user::*;
