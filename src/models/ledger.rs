//! # 단어 크레딧 원장(Word-Credit Ledger) 모델
//!
//! 사용자가 교정에 쓸 수 있는 단어 수(크레딧)와 구독, 요금제를 표현합니다.
//!
//! ## 크레딧 종류
//! - `free`: 가입 시 지급되는 무료 크레딧
//! - `subscription`: 구독 결제로 지급되는 크레딧 (구독 종료일에 만료)
//! - `topup`: 충전 결제로 지급되는 크레딧 (활성 구독이 있어야 구매 가능)

use serde::{Deserialize, Serialize};

/// 사용자의 단어 잔액 요약. 서버 원장의 읽기 전용 사본
///
/// 차감이나 충전이 일어날 때마다 캐시에서 무효화됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBalance {
    pub total_words_available: i64,
    pub free_words: i64,
    pub purchased_words: i64,
    /// 가장 먼저 만료되는 크레딧 배치의 만료 시각 (없으면 None)
    pub next_expiry_date: Option<String>,
    pub has_active_subscription: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CreditType {
    Free,
    Subscription,
    Topup,
}

/// 크레딧 배치: DB의 `word_credits` 테이블 한 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WordCredit {
    pub id: String,
    pub user_id: String,
    pub credit_type: CreditType,
    pub words_total: i64,
    pub words_remaining: i64,
    pub expires_at: Option<String>,
    pub order_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PlanType {
    Subscription,
    Topup,
}

/// 요금제: DB의 `plans` 테이블 한 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub plan_type: PlanType,
    pub price_paise: i64,
    pub words: i64,
    pub validity_days: i64,
    pub is_active: i64,
}

/// 구독: DB의 `subscriptions` 테이블 한 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub status: String,
    pub starts_at: String,
    pub ends_at: String,
    pub created_at: String,
}

/// 사용자별 사용 통계
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserStats {
    pub total_corrections: i64,
    pub grammar_corrections: i64,
    pub style_corrections: i64,
    pub total_words_used: i64,
    pub words_used_this_month: i64,
}

/// 사용자 요금 등급. 1회 교정 단어 상한을 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Subscribed,
}
