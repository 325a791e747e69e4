//! # 계정 조회 핸들러
//!
//! ## 엔드포인트
//! - `GET /api/v1/balance`      → 단어 잔액 요약
//! - `GET /api/v1/stats`        → 사용 통계
//! - `GET /api/v1/subscription` → 활성 구독 (없으면 null)
//! - `GET /api/v1/credits`      → 크레딧 배치 목록

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    db::ledger as db_ledger,
    error::AppError,
    middleware::auth::AuthUser,
    models::{Subscription, Tier, UserStats, WordBalance, WordCredit},
    routes::AppState,
    services::ledger::tier_of,
};

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    #[serde(flatten)]
    pub balance: WordBalance,
    pub tier: Tier,
    /// 이 사용자의 1회 교정 단어 상한
    pub word_limit: usize,
}

pub async fn balance(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = state.ledger.fetch_balance(&auth_user.user_id).await?;
    let tier = tier_of(&balance);

    Ok(Json(BalanceResponse {
        balance,
        tier,
        word_limit: state.ledger.word_limit(tier),
    }))
}

pub async fn stats(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserStats>, AppError> {
    Ok(Json(db_ledger::get_user_stats(&state.pool, &auth_user.user_id).await?))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Option<Subscription>,
}

pub async fn subscription(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let subscription = db_ledger::get_user_subscription(&state.pool, &auth_user.user_id).await?;
    Ok(Json(SubscriptionResponse { subscription }))
}

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub credits: Vec<WordCredit>,
}

pub async fn credits(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<CreditsResponse>, AppError> {
    let credits = db_ledger::list_credits(&state.pool, &auth_user.user_id).await?;
    Ok(Json(CreditsResponse { credits }))
}
