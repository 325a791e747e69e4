//! 요금제, 결제 주문, 인보이스 쿼리

use sqlx::{SqliteConnection, SqlitePool};

use crate::db::now_iso;
use crate::models::{Gateway, Invoice, OrderStatus, PaymentOrder, Plan};

const PLAN_COLUMNS: &str = "id, name, plan_type, price_paise, words, validity_days, is_active";
const ORDER_COLUMNS: &str = "id, user_id, plan_id, gateway, gateway_order_id, gateway_payment_id, amount_paise, status, failure_reason, created_at, updated_at";
const INVOICE_COLUMNS: &str = "id, invoice_number, order_id, user_id, plan_name, base_paise, cgst_paise, sgst_paise, total_paise, created_at";

pub async fn list_plans(pool: &SqlitePool) -> Result<Vec<Plan>, sqlx::Error> {
    sqlx::query_as::<_, Plan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM plans WHERE is_active = 1 ORDER BY plan_type, price_paise"
    ))
    .fetch_all(pool)
    .await
}

pub async fn get_plan(conn: &mut SqliteConnection, id: &str) -> Result<Option<Plan>, sqlx::Error> {
    sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn create_order(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    plan_id: &str,
    gateway: Gateway,
    gateway_order_id: &str,
    amount_paise: i64,
) -> Result<PaymentOrder, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO payment_orders (id, user_id, plan_id, gateway, gateway_order_id, amount_paise)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(plan_id)
    .bind(gateway)
    .bind(gateway_order_id)
    .bind(amount_paise)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, PaymentOrder>(&format!("SELECT {ORDER_COLUMNS} FROM payment_orders WHERE id = ?"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn find_order_by_gateway_id(
    conn: &mut SqliteConnection,
    gateway: Gateway,
    gateway_order_id: &str,
) -> Result<Option<PaymentOrder>, sqlx::Error> {
    sqlx::query_as::<_, PaymentOrder>(&format!(
        "SELECT {ORDER_COLUMNS} FROM payment_orders WHERE gateway = ? AND gateway_order_id = ?"
    ))
    .bind(gateway)
    .bind(gateway_order_id)
    .fetch_optional(conn)
    .await
}

pub async fn list_orders(pool: &SqlitePool, user_id: &str) -> Result<Vec<PaymentOrder>, sqlx::Error> {
    sqlx::query_as::<_, PaymentOrder>(&format!(
        "SELECT {ORDER_COLUMNS} FROM payment_orders WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// `created` 상태인 주문만 최종 상태로 옮깁니다.
///
/// 이미 처리된 주문이면 false를 돌려주며, 웹훅 중복 수신을 여기서 걸러냅니다.
pub async fn settle_order(
    conn: &mut SqliteConnection,
    order_id: &str,
    status: OrderStatus,
    gateway_payment_id: Option<&str>,
    failure_reason: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE payment_orders
        SET status = ?, gateway_payment_id = COALESCE(?, gateway_payment_id), failure_reason = ?, updated_at = ?
        WHERE id = ? AND status = 'created'
        "#,
    )
    .bind(status)
    .bind(gateway_payment_id)
    .bind(failure_reason)
    .bind(now_iso())
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// 인보이스 금액 (파이사)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceAmounts {
    pub base_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub total_paise: i64,
}

/// 인보이스를 발행합니다. 번호는 `INV-YYYYMM-00001` 형식의 월별 일련번호입니다.
pub async fn insert_invoice(
    conn: &mut SqliteConnection,
    order_id: &str,
    user_id: &str,
    plan_name: &str,
    amounts: InvoiceAmounts,
) -> Result<Invoice, sqlx::Error> {
    let prefix = format!("INV-{}-", chrono::Utc::now().format("%Y%m"));
    let issued: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE invoice_number LIKE ? || '%'")
        .bind(&prefix)
        .fetch_one(&mut *conn)
        .await?;
    let invoice_number = format!("{prefix}{:05}", issued + 1);
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query(
        r#"
        INSERT INTO invoices
            (id, invoice_number, order_id, user_id, plan_name, base_paise, cgst_paise, sgst_paise, total_paise)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&invoice_number)
    .bind(order_id)
    .bind(user_id)
    .bind(plan_name)
    .bind(amounts.base_paise)
    .bind(amounts.cgst_paise)
    .bind(amounts.sgst_paise)
    .bind(amounts.total_paise)
    .execute(&mut *conn)
    .await?;

    sqlx::query_as::<_, Invoice>(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?"))
        .bind(&id)
        .fetch_one(&mut *conn)
        .await
}

pub async fn list_invoices(pool: &SqlitePool, user_id: &str) -> Result<Vec<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all_invoices(pool: &SqlitePool) -> Result<Vec<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!("SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY created_at DESC"))
        .fetch_all(pool)
        .await
}

pub async fn get_invoice(pool: &SqlitePool, id: &str) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}
