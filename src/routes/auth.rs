//! # 인증 라우트 핸들러
//!
//! ## 엔드포인트
//! - `POST /api/v1/auth/register` → 회원가입 (무료 단어 크레딧 지급)
//! - `POST /api/v1/auth/login`    → 로그인
//! - `POST /api/v1/auth/refresh`  → 토큰 갱신 (refresh token 회전)
//! - `POST /api/v1/auth/logout`   → 로그아웃 (모든 refresh token 폐기)
//! - `GET  /api/v1/auth/me`       → 내 정보

use crate::{
    db::{iso_after_days, ledger as db_ledger, now_iso, users as db_users},
    error::AppError,
    middleware::auth::{hash_token, issue_token, verify_token, AuthUser, TokenKind, REFRESH_TOKEN_DAYS},
    models::{user::*, CreditType},
    routes::AppState,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (username, email) = req
        .normalized()
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    if db_users::find_by_username(&state.pool, username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    if let Some(email) = email {
        if db_users::find_by_email(&state.pool, email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
    }

    // Argon2id 해싱
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    // 계정 생성과 가입 크레딧 지급은 한 트랜잭션
    let policy = state.ledger.policy();
    let user_id = uuid::Uuid::now_v7().to_string();
    let mut tx = state.pool.begin().await?;
    let user = db_users::create_user(&mut tx, &user_id, username, email, &password_hash).await?;
    if policy.signup_free_words > 0 {
        let expires_at = iso_after_days(policy.free_credit_validity_days)?;
        db_ledger::grant_credits(
            &mut tx,
            &user.id,
            CreditType::Free,
            policy.signup_free_words,
            Some(&expires_at),
            None,
        )
        .await?;
    }
    tx.commit().await?;

    if policy.signup_free_words > 0 {
        tracing::info!(user_id = %user.id, words = policy.signup_free_words, "Signup credits granted");
    }
    Ok(Json(issue_tokens(&state, user).await?))
}

/// access/refresh 토큰 쌍을 만들고 refresh token 해시를 저장합니다.
async fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let token_error = |e: jsonwebtoken::errors::Error| AppError::Internal(format!("Token generation failed: {}", e));
    let access_token = issue_token(&user.id, TokenKind::Access, &state.jwt_secret).map_err(token_error)?;
    let refresh_token = issue_token(&user.id, TokenKind::Refresh, &state.jwt_secret).map_err(token_error)?;

    // DB에는 원문이 아니라 SHA-256 해시만 남깁니다
    let token_id = uuid::Uuid::now_v7().to_string();
    let expires_at = iso_after_days(REFRESH_TOKEN_DAYS)?;
    db_users::store_refresh_token(&state.pool, &token_id, &user.id, &hash_token(&refresh_token), &expires_at)
        .await?;

    Ok(AuthResponse {
        user: user.into(),
        access_token,
        refresh_token,
    })
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid username or password".to_string());
    let user = db_users::find_by_username(&state.pool, req.username.trim())
        .await?
        .ok_or_else(invalid)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password hash parse error: {}", e)))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    tracing::debug!(user_id = %user.id, "User logged in");
    Ok(Json(issue_tokens(&state, user).await?))
}

/// 사용한 refresh token은 지우고 새 쌍을 발급합니다 (회전).
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    verify_token(&req.refresh_token, TokenKind::Refresh, &state.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let token_hash = hash_token(&req.refresh_token);
    let (_token_id, user_id, expires_at) = db_users::find_refresh_token(&state.pool, &token_hash)
        .await?
        .ok_or(AppError::Unauthorized("Refresh token not found or revoked".to_string()))?;

    // 같은 형식의 타임스탬프라 문자열 비교로 충분
    if expires_at < now_iso() {
        db_users::delete_refresh_token(&state.pool, &token_hash).await?;
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db_users::find_by_id(&state.pool, &user_id)
        .await?
        .ok_or(AppError::Unauthorized("User not found".to_string()))?;

    db_users::delete_refresh_token(&state.pool, &token_hash).await?;
    Ok(Json(issue_tokens(&state, user).await?))
}

pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    db_users::delete_user_refresh_tokens(&state.pool, &auth_user.user_id).await?;

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = db_users::find_by_id(&state.pool, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(user.into()))
}
