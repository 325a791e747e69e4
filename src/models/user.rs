//! 사용자 계정과 인증 요청/응답 DTO

use serde::{Deserialize, Serialize};

pub const USERNAME_MIN_CHARS: usize = 3;
pub const PASSWORD_MIN_BYTES: usize = 8;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// API로 내보내는 사용자 (비밀번호 해시 제외)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

impl RegisterRequest {
    /// 앞뒤 공백을 걷어낸 (username, email). 규칙 위반이면 사용자에게 보여줄 메시지
    pub fn normalized(&self) -> Result<(&str, Option<&str>), &'static str> {
        let username = self.username.trim();
        if username.chars().count() < USERNAME_MIN_CHARS {
            return Err("Username must be at least 3 characters");
        }
        if self.password.len() < PASSWORD_MIN_BYTES {
            return Err("Password must be at least 8 characters");
        }
        let email = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
        if email.is_some_and(|e| !e.contains('@')) {
            return Err("Invalid email address");
        }
        Ok((username, email))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}
