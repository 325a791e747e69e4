//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`, `JWT_SECRET`: 필수
//! - `HOST`, `PORT`, `FRONTEND_DIST`: 서버 바인딩과 SPA 정적 파일 위치
//! - `OPENAI_*`, `GROK_*`, `LLM_*`: LLM 제공자 체인
//! - `FREE_WORD_LIMIT`, `SUBSCRIBED_WORD_LIMIT`, `SIGNUP_FREE_WORDS`,
//!   `FREE_CREDIT_VALIDITY_DAYS`: 단어 크레딧 정책
//! - `CACHE_TTL_SECS`: 교정 응답 캐시 유효 시간
//! - `RAZORPAY_*`, `CASHFREE_*`: 결제 게이트웨이
//! - `COMPANY_*`: 인보이스 머리글

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 하나의 OpenAI 호환 chat-completion 제공자 설정
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// 로그와 에러 메시지에 쓰이는 이름 (예: "openai", "grok")
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    /// 순서대로 시도할 모델 식별자 목록
    pub models: Vec<String>,
}

/// LLM 호출 공통 설정
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// 우선순위 순서의 제공자 목록 (첫 번째가 주 제공자)
    pub providers: Vec<ProviderConfig>,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// 단어 크레딧 정책
#[derive(Debug, Clone, Copy)]
pub struct WordPolicy {
    /// 무료 사용자의 1회 교정 단어 상한
    pub free_word_limit: usize,
    /// 구독 사용자의 1회 교정 단어 상한
    pub subscribed_word_limit: usize,
    /// 가입 시 지급하는 무료 단어 수
    pub signup_free_words: i64,
    /// 무료 크레딧 유효 기간(일)
    pub free_credit_validity_days: i64,
}

impl Default for WordPolicy {
    fn default() -> Self {
        Self {
            free_word_limit: 1000,
            subscribed_word_limit: 5000,
            signup_free_words: 1000,
            free_credit_validity_days: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct CashfreeConfig {
    pub app_id: String,
    pub secret_key: String,
    pub webhook_secret: String,
    pub base_url: String,
}

/// 인보이스 머리글에 찍히는 회사 정보
#[derive(Debug, Clone)]
pub struct CompanyInfo {
    pub name: String,
    pub address: String,
    pub gstin: String,
}

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 파일 경로 (예: "sqlite:data/sudhaar.db")
    pub database_url: String,
    /// JWT 토큰 서명/검증에 사용하는 비밀키
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// 빌드된 SPA 파일 디렉토리
    pub frontend_dist: String,
    pub llm: LlmSettings,
    pub words: WordPolicy,
    pub cache_ttl: Duration,
    /// 키가 없으면 해당 게이트웨이는 비활성화됩니다
    pub razorpay: Option<RazorpayConfig>,
    pub cashfree: Option<CashfreeConfig>,
    pub company: CompanyInfo,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    /// 숫자 파싱에 실패하면 기본값을 사용합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),
            frontend_dist: env::var("FRONTEND_DIST")
                .unwrap_or_else(|_| "../frontend/dist".to_string()),
            llm: LlmSettings {
                providers: providers_from_env(),
                timeout: Duration::from_secs(parse_or("LLM_TIMEOUT_SECS", 60)),
                temperature: parse_or("LLM_TEMPERATURE", 0.3),
                max_tokens: parse_or("LLM_MAX_TOKENS", 4000),
            },
            words: WordPolicy {
                free_word_limit: parse_or("FREE_WORD_LIMIT", 1000),
                subscribed_word_limit: parse_or("SUBSCRIBED_WORD_LIMIT", 5000),
                signup_free_words: parse_or("SIGNUP_FREE_WORDS", 1000),
                free_credit_validity_days: parse_or("FREE_CREDIT_VALIDITY_DAYS", 30),
            },
            cache_ttl: Duration::from_secs(parse_or("CACHE_TTL_SECS", 300)),
            razorpay: razorpay_from_env(),
            cashfree: cashfree_from_env(),
            company: CompanyInfo {
                name: env::var("COMPANY_NAME").unwrap_or_else(|_| "Sudhaar Technologies".to_string()),
                address: env::var("COMPANY_ADDRESS").unwrap_or_default(),
                gstin: env::var("COMPANY_GSTIN").unwrap_or_default(),
            },
        })
    }
}

/// 환경변수를 파싱하고, 없거나 형식이 틀리면 기본값을 돌려줍니다.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 비어 있지 않은 환경변수만 Some으로 돌려줍니다.
fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 쉼표로 구분된 모델 목록을 파싱합니다. 예: "gpt-4o, gpt-4o-mini"
pub fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

/// OpenAI를 주 제공자로, Grok(xAI)을 대체 제공자로 구성합니다.
fn providers_from_env() -> Vec<ProviderConfig> {
    let mut providers = Vec::new();

    if let Some(api_key) = non_empty("OPENAI_API_KEY") {
        providers.push(ProviderConfig {
            name: "openai".to_string(),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key,
            models: parse_model_list(
                &env::var("OPENAI_MODELS")
                    .unwrap_or_else(|_| "gpt-4o,gpt-4o-mini,gpt-3.5-turbo".to_string()),
            ),
        });
    }

    if let Some(api_key) = non_empty("GROK_API_KEY") {
        providers.push(ProviderConfig {
            name: "grok".to_string(),
            base_url: env::var("GROK_BASE_URL").unwrap_or_else(|_| "https://api.x.ai/v1".to_string()),
            api_key,
            models: parse_model_list(&env::var("GROK_MODEL").unwrap_or_else(|_| "grok-beta".to_string())),
        });
    }

    providers
}

fn razorpay_from_env() -> Option<RazorpayConfig> {
    Some(RazorpayConfig {
        key_id: non_empty("RAZORPAY_KEY_ID")?,
        key_secret: non_empty("RAZORPAY_KEY_SECRET")?,
        webhook_secret: non_empty("RAZORPAY_WEBHOOK_SECRET")?,
        base_url: env::var("RAZORPAY_BASE_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
    })
}

fn cashfree_from_env() -> Option<CashfreeConfig> {
    let secret_key = non_empty("CASHFREE_SECRET_KEY")?;
    Some(CashfreeConfig {
        app_id: non_empty("CASHFREE_APP_ID")?,
        // 웹훅 서명은 별도 비밀키가 없으면 API 비밀키로 검증합니다
        webhook_secret: non_empty("CASHFREE_WEBHOOK_SECRET").unwrap_or_else(|| secret_key.clone()),
        secret_key,
        base_url: env::var("CASHFREE_BASE_URL")
            .unwrap_or_else(|_| "https://api.cashfree.com/pg".to_string()),
    })
}
