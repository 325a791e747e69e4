//! # Sudhaar
//!
//! 힌디어 문법/문체 교정 서비스의 백엔드 라이브러리입니다.
//! 바이너리(`main.rs`)와 통합 테스트(`tests/`)가 같은 모듈을 씁니다.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
