//! # 결제 완료 처리(Fulfilment)
//!
//! 게이트웨이 웹훅이 결제 성공을 알리면 주문을 한 트랜잭션 안에서 처리합니다.
//!
//! - 구독 요금제: 구독을 만들고 구독 크레딧을 지급합니다.
//! - 충전 요금제: 활성 구독이 있을 때만 크레딧을 지급합니다.
//!   없으면 주문을 `rejected`로 표시하고 크레딧은 주지 않습니다.
//! - 지급된 주문마다 인보이스를 한 장 발행합니다.
//!
//! 같은 주문에 대한 웹훅이 여러 번 와도 한 번만 처리됩니다.
//!
//! ## 트랜잭션
//! `pool.begin()`으로 얻은 `tx`는 `&mut SqliteConnection`으로 역참조(Deref)되므로
//! `db::ledger`, `db::payments`의 함수에 그대로 넘길 수 있습니다.
//! `tx.commit()` 없이 `tx`가 drop되면(에러로 `?` 조기 반환 등) 자동으로 롤백됩니다.

use sqlx::SqlitePool;

use crate::db::ledger as db_ledger;
use crate::db::payments::{self as db_payments, InvoiceAmounts};
use crate::db::iso_after_days;
use crate::error::AppError;
use crate::models::{CreditType, Gateway, OrderStatus, PlanType};

/// GST 18% (CGST 9% + SGST 9%)
const GST_PERCENT: i64 = 18;

pub const REJECTED_NO_SUBSCRIPTION: &str = "Top-up requires an active subscription";
pub const REJECTED_AMOUNT_MISMATCH: &str = "Paid amount does not match the order";

/// GST 포함 가격을 세액으로 나눕니다.
///
/// base = round(total × 100 / 118), 나머지를 CGST와 SGST가 반씩 나누고 홀수 파이사는 CGST에 붙습니다.
pub fn tax_breakdown(total_paise: i64) -> InvoiceAmounts {
    let divisor = 100 + GST_PERCENT;
    let base_paise = (total_paise * 100 + divisor / 2) / divisor;
    let tax = total_paise - base_paise;
    let sgst_paise = tax / 2;
    InvoiceAmounts {
        base_paise,
        cgst_paise: tax - sgst_paise,
        sgst_paise,
        total_paise,
    }
}

/// 웹훅이 알려준 결제 정보
#[derive(Debug, Clone)]
pub struct PaymentNotice<'a> {
    pub gateway: Gateway,
    pub gateway_order_id: &'a str,
    pub gateway_payment_id: Option<&'a str>,
    /// 게이트웨이가 알려준 결제 금액 (있으면 주문 금액과 대조)
    pub amount_paise: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfilmentOutcome {
    Fulfilled {
        order_id: String,
        user_id: String,
        invoice_id: String,
    },
    Rejected {
        order_id: String,
        user_id: String,
        reason: &'static str,
    },
    AlreadyProcessed {
        order_id: String,
    },
    UnknownOrder,
}

pub async fn fulfil_order(pool: &SqlitePool, notice: &PaymentNotice<'_>) -> Result<FulfilmentOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let Some(order) =
        db_payments::find_order_by_gateway_id(&mut tx, notice.gateway, notice.gateway_order_id).await?
    else {
        tracing::warn!(gateway = notice.gateway.as_str(), order = notice.gateway_order_id, "Webhook for unknown order");
        return Ok(FulfilmentOutcome::UnknownOrder);
    };
    if order.status != OrderStatus::Created {
        return Ok(FulfilmentOutcome::AlreadyProcessed { order_id: order.id });
    }

    let plan = db_payments::get_plan(&mut tx, &order.plan_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Plan {} missing for order {}", order.plan_id, order.id)))?;

    let rejection = if notice.amount_paise.is_some_and(|paid| paid != order.amount_paise) {
        Some(REJECTED_AMOUNT_MISMATCH)
    } else if plan.plan_type == PlanType::Topup
        && !db_ledger::has_active_subscription(&mut tx, &order.user_id).await?
    {
        Some(REJECTED_NO_SUBSCRIPTION)
    } else {
        None
    };

    if let Some(reason) = rejection {
        let status = if reason == REJECTED_AMOUNT_MISMATCH {
            OrderStatus::Failed
        } else {
            OrderStatus::Rejected
        };
        if !db_payments::settle_order(&mut tx, &order.id, status, notice.gateway_payment_id, Some(reason)).await? {
            return Ok(FulfilmentOutcome::AlreadyProcessed { order_id: order.id });
        }
        tx.commit().await?;
        tracing::warn!(order_id = %order.id, user_id = %order.user_id, reason, "Order rejected");
        return Ok(FulfilmentOutcome::Rejected {
            order_id: order.id,
            user_id: order.user_id,
            reason,
        });
    }

    if !db_payments::settle_order(&mut tx, &order.id, OrderStatus::Paid, notice.gateway_payment_id, None).await? {
        return Ok(FulfilmentOutcome::AlreadyProcessed { order_id: order.id });
    }

    match plan.plan_type {
        PlanType::Subscription => {
            db_ledger::create_subscription_for_user(&mut tx, &order.user_id, &plan, Some(&order.id)).await?;
        }
        PlanType::Topup => {
            let expires_at = iso_after_days(plan.validity_days)?;
            db_ledger::grant_credits(
                &mut tx,
                &order.user_id,
                CreditType::Topup,
                plan.words,
                Some(&expires_at),
                Some(&order.id),
            )
            .await?;
        }
    }

    let invoice = db_payments::insert_invoice(
        &mut tx,
        &order.id,
        &order.user_id,
        &plan.name,
        tax_breakdown(order.amount_paise),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %order.user_id,
        plan = %plan.id,
        invoice = %invoice.invoice_number,
        "Order fulfilled"
    );
    Ok(FulfilmentOutcome::Fulfilled {
        order_id: order.id,
        user_id: order.user_id,
        invoice_id: invoice.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn tax_split_sums_to_total() {
        let amounts = tax_breakdown(19900);
        assert_eq!(amounts.base_paise, 16864);
        assert_eq!(amounts.cgst_paise, 1518);
        assert_eq!(amounts.sgst_paise, 1518);

        let odd = tax_breakdown(29900);
        assert_eq!(odd.base_paise, 25339);
        assert_eq!(odd.cgst_paise, 2281);
        assert_eq!(odd.sgst_paise, 2280);
        assert_eq!(odd.base_paise + odd.cgst_paise + odd.sgst_paise, 29900);
    }

    async fn order(pool: &SqlitePool, id: &str, plan_id: &str, amount: i64) {
        db_payments::create_order(pool, id, "u1", plan_id, Gateway::Razorpay, &format!("order_{id}"), amount)
            .await
            .unwrap();
    }

    async fn setup() -> SqlitePool {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO users (id, username, password_hash) VALUES ('u1', 'u1', 'x')")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    fn notice(gateway_order_id: &str) -> PaymentNotice<'_> {
        PaymentNotice {
            gateway: Gateway::Razorpay,
            gateway_order_id,
            gateway_payment_id: Some("pay_1"),
            amount_paise: None,
        }
    }

    #[tokio::test]
    async fn subscription_then_topup_is_credited_once() {
        let pool = setup().await;
        order(&pool, "o1", "basic-monthly", 19900).await;
        order(&pool, "o2", "topup-5k", 9900).await;

        let first = fulfil_order(&pool, &notice("order_o1")).await.unwrap();
        assert!(matches!(first, FulfilmentOutcome::Fulfilled { .. }));
        let topup = fulfil_order(&pool, &notice("order_o2")).await.unwrap();
        assert!(matches!(topup, FulfilmentOutcome::Fulfilled { .. }));
        let replay = fulfil_order(&pool, &notice("order_o2")).await.unwrap();
        assert_eq!(replay, FulfilmentOutcome::AlreadyProcessed { order_id: "o2".to_string() });

        assert_eq!(db_ledger::get_user_word_balance(&pool, "u1").await.unwrap(), 15000);
        assert_eq!(db_payments::list_invoices(&pool, "u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn topup_without_subscription_is_rejected() {
        let pool = setup().await;
        order(&pool, "o1", "topup-5k", 9900).await;

        let outcome = fulfil_order(&pool, &notice("order_o1")).await.unwrap();
        assert!(matches!(
            outcome,
            FulfilmentOutcome::Rejected { reason: REJECTED_NO_SUBSCRIPTION, .. }
        ));
        assert_eq!(db_ledger::get_user_word_balance(&pool, "u1").await.unwrap(), 0);
        assert!(db_payments::list_invoices(&pool, "u1").await.unwrap().is_empty());

        let orders = db_payments::list_orders(&pool, "u1").await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn amount_mismatch_fails_the_order() {
        let pool = setup().await;
        order(&pool, "o1", "basic-monthly", 19900).await;
        let mut underpaid = notice("order_o1");
        underpaid.amount_paise = Some(100);

        let outcome = fulfil_order(&pool, &underpaid).await.unwrap();
        assert!(matches!(outcome, FulfilmentOutcome::Rejected { reason: REJECTED_AMOUNT_MISMATCH, .. }));
        assert!(!db_ledger::check_user_has_active_subscription(&pool, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_orders_are_ignored() {
        let pool = setup().await;
        assert_eq!(
            fulfil_order(&pool, &notice("order_missing")).await.unwrap(),
            FulfilmentOutcome::UnknownOrder
        );
    }
}
