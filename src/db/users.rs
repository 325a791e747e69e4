//! 사용자와 refresh token 쿼리

use sqlx::{SqliteConnection, SqlitePool};

use crate::db::now_iso;
use crate::error::AppError;
use crate::models::user::User;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

/// 사용자 조회에 쓰는 유일 키
#[derive(Debug, Clone, Copy)]
enum UserKey<'a> {
    Id(&'a str),
    Username(&'a str),
    Email(&'a str),
}

async fn find_by(pool: &SqlitePool, key: UserKey<'_>) -> Result<Option<User>, AppError> {
    let (column, value) = match key {
        UserKey::Id(v) => ("id", v),
        UserKey::Username(v) => ("username", v),
        UserKey::Email(v) => ("email", v),
    };
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?"))
        .bind(value)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// 새 사용자는 항상 `user` 역할로 시작합니다.
///
/// 가입 크레딧 지급과 같은 트랜잭션에서 부를 수 있도록 커넥션을 받습니다.
pub async fn create_user(
    conn: &mut SqliteConnection,
    id: &str,
    username: &str,
    email: Option<&str>,
    password_hash: &str,
) -> Result<User, AppError> {
    sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(&mut *conn)
        .await?;

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, AppError> {
    find_by(pool, UserKey::Id(id)).await
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, AppError> {
    find_by(pool, UserKey::Username(username)).await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    find_by(pool, UserKey::Email(email)).await
}

/// 역할을 바꿉니다. 사용자가 없으면 None
pub async fn set_role(pool: &SqlitePool, id: &str, role: &str) -> Result<Option<User>, AppError> {
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role)
        .bind(now_iso())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}

// ── refresh token (원문 대신 SHA-256 해시 저장) ──

pub async fn store_refresh_token(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    token_hash: &str,
    expires_at: &str,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// (token id, user id, expires_at)
pub async fn find_refresh_token(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<(String, String, String)>, AppError> {
    Ok(
        sqlx::query_as("SELECT id, user_id, expires_at FROM refresh_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn delete_refresh_token(pool: &SqlitePool, token_hash: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = ?")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// 로그아웃: 이 사용자의 모든 refresh token 폐기
pub async fn delete_user_refresh_tokens(pool: &SqlitePool, user_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
