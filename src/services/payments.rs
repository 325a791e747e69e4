//! # 결제 게이트웨이 연동
//!
//! Razorpay와 Cashfree의 주문 생성 API 호출, 그리고 웹훅 서명 검증을 담당합니다.
//!
//! ## 웹훅 서명
//! | 게이트웨이 | 헤더 | 서명 대상 | 인코딩 |
//! |------------|------|-----------|--------|
//! | Razorpay | `X-Razorpay-Signature` | 본문 | hex |
//! | Cashfree | `x-webhook-signature` (+ `x-webhook-timestamp`) | 타임스탬프 + 본문 | base64 |
//!
//! 둘 다 HMAC-SHA256이며 비교는 상수 시간(`verify_slice`)으로 합니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use thiserror::Error;

use crate::config::{CashfreeConfig, RazorpayConfig};
use crate::models::Gateway;

type HmacSha256 = Hmac<Sha256>;

const CASHFREE_API_VERSION: &str = "2023-08-01";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{gateway} returned HTTP {status}: {body}")]
    Gateway {
        gateway: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// 게이트웨이에 보낼 주문 정보
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// 우리 쪽 주문 id (영수증 번호로도 씁니다)
    pub order_id: String,
    pub amount_paise: i64,
    pub customer_id: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

/// 게이트웨이가 만든 주문
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub gateway_order_id: String,
    /// 프론트엔드 결제창을 여는 데 필요한 값
    pub checkout_token: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn gateway(&self) -> Gateway;

    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, PaymentError>;

    /// 웹훅 서명을 검증합니다. `timestamp`는 Cashfree만 사용합니다.
    fn verify_webhook(&self, body: &[u8], signature: &str, timestamp: Option<&str>) -> Result<(), PaymentError>;
}

fn http_client() -> Result<reqwest::Client, PaymentError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?)
}

async fn error_for_status(
    gateway: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, PaymentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(gateway, status = status.as_u16(), "Order creation rejected by gateway");
    Err(PaymentError::Gateway {
        gateway,
        status: status.as_u16(),
        body,
    })
}

// ── Razorpay ──

pub struct RazorpayClient {
    http: reqwest::Client,
    config: RazorpayConfig,
}

#[derive(Debug, Deserialize)]
struct RazorpayOrderResponse {
    id: String,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Result<Self, PaymentError> {
        Ok(Self {
            http: http_client()?,
            config,
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    fn gateway(&self) -> Gateway {
        Gateway::Razorpay
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, PaymentError> {
        let response = self
            .http
            .post(format!("{}/orders", self.config.base_url.trim_end_matches('/')))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&json!({
                "amount": request.amount_paise,
                "currency": "INR",
                "receipt": request.order_id,
            }))
            .send()
            .await?;
        let order: RazorpayOrderResponse = error_for_status("razorpay", response).await?.json().await?;

        Ok(GatewayOrder {
            gateway_order_id: order.id,
            checkout_token: self.config.key_id.clone(),
        })
    }

    fn verify_webhook(&self, body: &[u8], signature: &str, _timestamp: Option<&str>) -> Result<(), PaymentError> {
        verify_razorpay_signature(&self.config.webhook_secret, body, signature)
    }
}

// ── Cashfree ──

pub struct CashfreeClient {
    http: reqwest::Client,
    config: CashfreeConfig,
}

#[derive(Debug, Deserialize)]
struct CashfreeOrderResponse {
    order_id: String,
    payment_session_id: String,
}

impl CashfreeClient {
    pub fn new(config: CashfreeConfig) -> Result<Self, PaymentError> {
        Ok(Self {
            http: http_client()?,
            config,
        })
    }
}

#[async_trait]
impl PaymentGateway for CashfreeClient {
    fn gateway(&self) -> Gateway {
        Gateway::Cashfree
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, PaymentError> {
        let phone = request
            .customer_phone
            .as_deref()
            .ok_or_else(|| PaymentError::InvalidPayload("customer_phone is required for Cashfree".to_string()))?;

        let response = self
            .http
            .post(format!("{}/orders", self.config.base_url.trim_end_matches('/')))
            .header("x-client-id", &self.config.app_id)
            .header("x-client-secret", &self.config.secret_key)
            .header("x-api-version", CASHFREE_API_VERSION)
            .json(&json!({
                "order_id": request.order_id,
                // Cashfree는 루피 단위 소수로 받습니다
                "order_amount": request.amount_paise as f64 / 100.0,
                "order_currency": "INR",
                "customer_details": {
                    "customer_id": request.customer_id,
                    "customer_phone": phone,
                    "customer_email": request.customer_email,
                },
            }))
            .send()
            .await?;
        let order: CashfreeOrderResponse = error_for_status("cashfree", response).await?.json().await?;

        Ok(GatewayOrder {
            gateway_order_id: order.order_id,
            checkout_token: order.payment_session_id,
        })
    }

    fn verify_webhook(&self, body: &[u8], signature: &str, timestamp: Option<&str>) -> Result<(), PaymentError> {
        let timestamp = timestamp.ok_or(PaymentError::InvalidSignature)?;
        verify_cashfree_signature(&self.config.webhook_secret, timestamp, body, signature)
    }
}

/// 설정된 게이트웨이 모음. 키가 없는 게이트웨이는 None입니다.
#[derive(Clone, Default)]
pub struct Gateways {
    pub razorpay: Option<Arc<dyn PaymentGateway>>,
    pub cashfree: Option<Arc<dyn PaymentGateway>>,
}

impl Gateways {
    pub fn from_config(
        razorpay: Option<RazorpayConfig>,
        cashfree: Option<CashfreeConfig>,
    ) -> Result<Self, PaymentError> {
        let razorpay = match razorpay {
            Some(config) => Some(Arc::new(RazorpayClient::new(config)?) as Arc<dyn PaymentGateway>),
            None => None,
        };
        let cashfree = match cashfree {
            Some(config) => Some(Arc::new(CashfreeClient::new(config)?) as Arc<dyn PaymentGateway>),
            None => None,
        };
        Ok(Self { razorpay, cashfree })
    }

    pub fn get(&self, gateway: Gateway) -> Result<Arc<dyn PaymentGateway>, PaymentError> {
        let client = match gateway {
            Gateway::Razorpay => self.razorpay.clone(),
            Gateway::Cashfree => self.cashfree.clone(),
        };
        client.ok_or(PaymentError::NotConfigured(gateway.as_str()))
    }
}

// ── 서명 ──

fn mac(secret: &str) -> Result<HmacSha256, PaymentError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::InvalidSignature)
}

/// hex(HMAC-SHA256(body))
pub fn razorpay_signature(secret: &str, body: &[u8]) -> Result<String, PaymentError> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_razorpay_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), PaymentError> {
    let expected = hex::decode(signature.trim()).map_err(|_| PaymentError::InvalidSignature)?;
    let mut mac = mac(secret)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentError::InvalidSignature)
}

/// base64(HMAC-SHA256(timestamp + body))
pub fn cashfree_signature(secret: &str, timestamp: &str, body: &[u8]) -> Result<String, PaymentError> {
    let mut mac = mac(secret)?;
    mac.update(timestamp.as_bytes());
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn verify_cashfree_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), PaymentError> {
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| PaymentError::InvalidSignature)?;
    let mut mac = mac(secret)?;
    mac.update(timestamp.as_bytes());
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn razorpay_signature_is_hex_hmac_of_body() {
        let body = br#"{"event":"payment.captured"}"#;
        let signature = razorpay_signature("whsec", body).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify_razorpay_signature("whsec", body, &signature).is_ok());
        assert!(matches!(
            verify_razorpay_signature("other", body, &signature),
            Err(PaymentError::InvalidSignature)
        ));
        assert!(matches!(
            verify_razorpay_signature("whsec", body, "not-hex"),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn cashfree_signature_covers_timestamp() {
        let body = br#"{"type":"PAYMENT_SUCCESS_WEBHOOK"}"#;
        let signature = cashfree_signature("cfsec", "1700000000", body).unwrap();
        assert!(verify_cashfree_signature("cfsec", "1700000000", body, &signature).is_ok());
        assert!(verify_cashfree_signature("cfsec", "1700000001", body, &signature).is_err());
    }

    #[test]
    fn unconfigured_gateway_is_reported() {
        let gateways = Gateways::default();
        assert!(matches!(
            gateways.get(Gateway::Cashfree),
            Err(PaymentError::NotConfigured("cashfree"))
        ));
    }
}
