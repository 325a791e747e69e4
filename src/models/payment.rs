//! # 결제 모델 정의
//!
//! 결제 주문, 인보이스, 그리고 두 결제 게이트웨이(Razorpay, Cashfree)의
//! 웹훅 페이로드 구조체입니다.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Gateway {
    Razorpay,
    Cashfree,
}

impl Gateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Razorpay => "razorpay",
            Self::Cashfree => "cashfree",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Paid,
    Rejected,
    Failed,
}

/// 결제 주문: DB의 `payment_orders` 테이블 한 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentOrder {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub gateway: Gateway,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount_paise: i64,
    pub status: OrderStatus,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// 인보이스: DB의 `invoices` 테이블 한 행
///
/// 금액은 모두 파이사(paise, 1루피 = 100파이사) 단위 정수입니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub order_id: String,
    pub user_id: String,
    pub plan_name: String,
    pub base_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub total_paise: i64,
    pub created_at: String,
}

/// `POST /payments/orders` 요청 본문
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub plan_id: String,
    pub gateway: Gateway,
    /// Cashfree 주문에 필요한 고객 전화번호
    pub customer_phone: Option<String>,
}

/// 주문 생성 응답. 프론트엔드는 이 값으로 게이트웨이 결제창을 엽니다.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub gateway: Gateway,
    pub gateway_order_id: String,
    pub amount_paise: i64,
    /// Razorpay: 공개 key id, Cashfree: payment_session_id
    pub checkout_token: String,
}

// ── Razorpay 웹훅 ──
// { "event": "payment.captured",
//   "payload": { "payment": { "entity": { "id": "pay_..", "order_id": "order_..", ... } } } }

#[derive(Debug, Deserialize)]
pub struct RazorpayWebhook {
    pub event: String,
    #[serde(default)]
    pub payload: RazorpayPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct RazorpayPayload {
    pub payment: Option<RazorpayEntityWrapper>,
    pub order: Option<RazorpayEntityWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayEntityWrapper {
    pub entity: RazorpayEntity,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: Option<i64>,
    pub status: Option<String>,
}

// ── Cashfree 웹훅 ──
// { "type": "PAYMENT_SUCCESS_WEBHOOK",
//   "data": { "order": { "order_id": "..", "order_amount": 99.0 },
//             "payment": { "cf_payment_id": 123, "payment_status": "SUCCESS" } } }

pub const CASHFREE_PAYMENT_SUCCESS: &str = "PAYMENT_SUCCESS_WEBHOOK";

/// 환불, 정산 등 다른 이벤트는 `data` 모양이 달라서 `type`만 필수입니다.
#[derive(Debug, Deserialize)]
pub struct CashfreeWebhook {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: CashfreeWebhookData,
}

#[derive(Debug, Default, Deserialize)]
pub struct CashfreeWebhookData {
    pub order: Option<CashfreeOrder>,
    pub payment: Option<CashfreePayment>,
}

#[derive(Debug, Deserialize)]
pub struct CashfreeOrder {
    pub order_id: String,
    pub order_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CashfreePayment {
    /// Cashfree는 숫자 또는 문자열로 보냅니다
    pub cf_payment_id: Option<serde_json::Value>,
    pub payment_status: Option<String>,
}

impl CashfreePayment {
    pub fn payment_id(&self) -> Option<String> {
        match self.cf_payment_id.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
