//! # 미들웨어 모듈
//!
//! - `auth`: JWT 인증 추출기(`AuthUser`, `AdminUser`)와 토큰 생성/검증

pub mod auth;
