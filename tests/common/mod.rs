//! 통합 테스트 공용 도우미: 메모리 DB, 가짜 LLM 제공자, 라우터 호출

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

use sudhaar::config::{CashfreeConfig, CompanyInfo, RazorpayConfig, WordPolicy};
use sudhaar::routes::{self, AppState};
use sudhaar::services::{
    cache::ResponseCache,
    dictionary::{WordDictionary, WordReplacementRule},
    inflight::InFlight,
    ledger::CreditLedger,
    llm::{ChatMessage, CompletionParams, CompletionProvider, LlmCorrector, LlmError},
    payments::{CashfreeClient, Gateways, PaymentGateway, RazorpayClient},
    pipeline::CorrectionPipeline,
};

pub const RAZORPAY_WEBHOOK_SECRET: &str = "rzp-webhook-secret";
pub const CASHFREE_WEBHOOK_SECRET: &str = "cf-webhook-secret";

/// 사용자 메시지를 그대로 돌려주는 제공자. 호출 횟수를 셉니다.
#[derive(Default)]
pub struct EchoProvider {
    pub calls: AtomicUsize,
}

impl EchoProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, messages: &[ChatMessage], _: CompletionParams) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub provider: Arc<EchoProvider>,
}

pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

fn gateways() -> Gateways {
    let razorpay = RazorpayClient::new(RazorpayConfig {
        key_id: "rzp_test_key".to_string(),
        key_secret: "rzp_test_secret".to_string(),
        webhook_secret: RAZORPAY_WEBHOOK_SECRET.to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
    })
    .unwrap();
    let cashfree = CashfreeClient::new(CashfreeConfig {
        app_id: "cf_app".to_string(),
        secret_key: "cf_secret".to_string(),
        webhook_secret: CASHFREE_WEBHOOK_SECRET.to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
    })
    .unwrap();
    Gateways {
        razorpay: Some(Arc::new(razorpay) as Arc<dyn PaymentGateway>),
        cashfree: Some(Arc::new(cashfree) as Arc<dyn PaymentGateway>),
    }
}

/// 사전 규칙 `गए → गये`, `आए → आये`와 에코 제공자로 앱을 만듭니다.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_policy(WordPolicy::default()).await
}

pub async fn spawn_app_with_policy(policy: WordPolicy) -> TestApp {
    let pool = test_pool().await;
    let provider = Arc::new(EchoProvider::default());
    let dictionary = WordDictionary::new(vec![
        WordReplacementRule::new("गए", "गये"),
        WordReplacementRule::new("आए", "आये"),
    ]);
    let pipeline = CorrectionPipeline::new(
        Arc::new(dictionary),
        LlmCorrector::new(provider.clone(), CompletionParams::default()),
    );

    let state = AppState {
        pool: pool.clone(),
        jwt_secret: "test-jwt-secret".to_string(),
        company: CompanyInfo {
            name: "Sudhaar Test".to_string(),
            address: "Jaipur".to_string(),
            gstin: "08ABCDE1234F1Z5".to_string(),
        },
        pipeline,
        ledger: CreditLedger::new(pool.clone(), policy, Duration::from_secs(300)),
        cache: ResponseCache::new(Duration::from_secs(300)),
        inflight: InFlight::default(),
        gateways: gateways(),
    };

    TestApp {
        router: routes::router(state),
        pool,
        provider,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = self.send(request).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    /// 가입 후 (사용자 id, access token)을 돌려줍니다.
    pub async fn register(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.in"),
                    "password": "correct-horse-battery",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["access_token"].as_str().unwrap().to_string(),
        )
    }
}

/// 공백으로 구분된 단어 `n`개
pub fn words(n: usize) -> String {
    vec!["शब्द"; n].join(" ")
}
