//! # 인증 추출기(Extractor)와 토큰 유틸리티
//!
//! - `AuthUser`: `Authorization: Bearer <access token>` 헤더를 검증한 사용자
//! - `AdminUser`: `AuthUser`이면서 DB의 역할이 `admin`인 사용자
//!
//! 역할은 토큰에 싣지 않고 요청마다 DB에서 읽으므로, 역할 변경이 바로 반영됩니다.
//! access/refresh 토큰은 같은 비밀키로 서명하고 `typ` 클레임으로 구분합니다.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::db::users as db_users;
use crate::routes::AppState;

pub const ACCESS_TOKEN_MINUTES: i64 = 15;
pub const REFRESH_TOKEN_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn lifetime(self) -> Duration {
        match self {
            TokenKind::Access => Duration::minutes(ACCESS_TOKEN_MINUTES),
            TokenKind::Refresh => Duration::days(REFRESH_TOKEN_DAYS),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 사용자 id
    pub sub: String,
    pub typ: TokenKind,
    pub exp: i64,
    pub iat: i64,
    /// 같은 초에 발급해도 refresh token 해시가 겹치지 않게 함
    pub jti: String,
}

pub fn issue_token(
    user_id: &str,
    kind: TokenKind,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        typ: kind,
        iat: now.timestamp(),
        exp: (now + kind.lifetime()).timestamp(),
        jti: uuid::Uuid::now_v7().to_string(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// 서명, 만료, 토큰 종류를 모두 확인합니다.
pub fn verify_token(token: &str, kind: TokenKind, secret: &str) -> Result<Claims, AuthError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?
    .claims;

    if claims.typ != kind {
        return Err(AuthError::InvalidToken);
    }
    Ok(claims)
}

/// DB 저장용 SHA-256 hex
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = verify_token(bearer_token(parts)?, TokenKind::Access, &state.jwt_secret)?;
        Ok(AuthUser { user_id: claims.sub })
    }
}

/// 관리자 전용 핸들러의 추출기
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser { user_id } = AuthUser::from_request_parts(parts, state).await?;

        let is_admin = db_users::find_by_id(&state.pool, &user_id)
            .await
            .map_err(|e| {
                tracing::error!(%user_id, "Failed to load user for admin check: {e}");
                AuthError::Unavailable
            })?
            .ok_or(AuthError::InvalidToken)?
            .is_admin();

        if !is_admin {
            tracing::warn!(%user_id, "Non-admin attempted admin access");
            return Err(AuthError::NotAdmin);
        }
        Ok(AdminUser { user_id })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    NotAdmin,
    Unavailable,
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "missing_token", "Authorization token is required"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", "Invalid authorization token"),
            AuthError::ExpiredToken => (StatusCode::UNAUTHORIZED, "expired_token", "Authorization token has expired"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "forbidden", "Administrator role is required"),
            AuthError::Unavailable => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "An internal error occurred"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_carries_subject_and_rejects_other_secrets() {
        let token = issue_token("user-1", TokenKind::Access, "secret").unwrap();
        let claims = verify_token(&token, TokenKind::Access, "secret").unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(matches!(
            verify_token(&token, TokenKind::Access, "other-secret"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let refresh = issue_token("user-1", TokenKind::Refresh, "secret").unwrap();
        assert!(matches!(
            verify_token(&refresh, TokenKind::Access, "secret"),
            Err(AuthError::InvalidToken)
        ));
        assert!(verify_token(&refresh, TokenKind::Refresh, "secret").is_ok());
    }

    #[test]
    fn token_hash_is_hex_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
