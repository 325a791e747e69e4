//! 단어 크레딧 원장 쿼리
//!
//! 잔액은 만료되지 않은 크레딧 배치의 `words_remaining` 합계입니다.
//! 차감은 한 트랜잭션 안에서 배치를 순서대로 깎으며,
//! 잔액이 모자라면 아무것도 바꾸지 않고 `false`를 돌려줍니다.

use sqlx::{SqliteConnection, SqlitePool};

use crate::db::{iso_after_days, now_iso};
use crate::error::AppError;
use crate::models::{CreditType, Plan, Subscription, UserStats, WordBalance, WordCredit};

/// 만료되지 않았고 남은 단어가 있는 배치 조건
const LIVE_CREDIT: &str = "words_remaining > 0 AND (expires_at IS NULL OR expires_at > ?)";

/// 차감 순서
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeductionOrder {
    /// 오래 전에 지급된 배치부터
    Oldest,
    /// 먼저 만료되는 배치부터, 만료 없는 배치는 마지막
    EarliestExpiry,
}

impl DeductionOrder {
    fn order_by(self) -> &'static str {
        match self {
            Self::Oldest => "created_at ASC, id ASC",
            Self::EarliestExpiry => "expires_at IS NULL, expires_at ASC, created_at ASC, id ASC",
        }
    }
}

pub async fn get_user_word_balance(pool: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
    let sql = format!(
        "SELECT COALESCE(SUM(words_remaining), 0) FROM word_credits WHERE user_id = ? AND {LIVE_CREDIT}"
    );
    sqlx::query_scalar(&sql)
        .bind(user_id)
        .bind(now_iso())
        .fetch_one(pool)
        .await
}

pub async fn get_user_word_balance_detailed(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<WordBalance, sqlx::Error> {
    let now = now_iso();
    let sql = format!(
        r#"
        SELECT
            COALESCE(SUM(words_remaining), 0),
            COALESCE(SUM(CASE WHEN credit_type = 'free' THEN words_remaining ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN credit_type != 'free' THEN words_remaining ELSE 0 END), 0),
            MIN(expires_at)
        FROM word_credits
        WHERE user_id = ? AND {LIVE_CREDIT}
        "#
    );
    let (total, free, purchased, next_expiry): (i64, i64, i64, Option<String>) =
        sqlx::query_as(&sql)
            .bind(user_id)
            .bind(&now)
            .fetch_one(pool)
            .await?;

    Ok(WordBalance {
        total_words_available: total,
        free_words: free,
        purchased_words: purchased,
        next_expiry_date: next_expiry,
        has_active_subscription: check_user_has_active_subscription(pool, user_id).await?,
    })
}

/// 지급 순서대로 차감합니다.
pub async fn deduct_words(
    pool: &SqlitePool,
    user_id: &str,
    words: i64,
    action_type: &str,
    text_sample: Option<&str>,
) -> Result<bool, sqlx::Error> {
    deduct(pool, user_id, words, action_type, text_sample, DeductionOrder::Oldest).await
}

/// 먼저 만료되는 배치부터 차감합니다. 만료 없는 배치는 마지막에 씁니다.
pub async fn deduct_words_with_priority(
    pool: &SqlitePool,
    user_id: &str,
    words: i64,
    action_type: &str,
    text_sample: Option<&str>,
) -> Result<bool, sqlx::Error> {
    deduct(pool, user_id, words, action_type, text_sample, DeductionOrder::EarliestExpiry).await
}

async fn deduct(
    pool: &SqlitePool,
    user_id: &str,
    words: i64,
    action_type: &str,
    text_sample: Option<&str>,
    order: DeductionOrder,
) -> Result<bool, sqlx::Error> {
    if words <= 0 {
        return Ok(true);
    }

    let mut tx = pool.begin().await?;
    let sql = format!(
        "SELECT id, words_remaining FROM word_credits WHERE user_id = ? AND {LIVE_CREDIT} ORDER BY {}",
        order.order_by()
    );
    let batches: Vec<(String, i64)> = sqlx::query_as(&sql)
        .bind(user_id)
        .bind(now_iso())
        .fetch_all(&mut *tx)
        .await?;

    let available: i64 = batches.iter().map(|(_, remaining)| remaining).sum();
    if available < words {
        tx.rollback().await?;
        tracing::debug!(user_id, words, available, "Deduction refused, balance too low");
        return Ok(false);
    }

    let mut outstanding = words;
    for (id, remaining) in batches {
        if outstanding == 0 {
            break;
        }
        let take = remaining.min(outstanding);
        sqlx::query("UPDATE word_credits SET words_remaining = words_remaining - ? WHERE id = ?")
            .bind(take)
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        outstanding -= take;
    }

    sqlx::query(
        r#"
        INSERT INTO word_usage (id, user_id, words_used, action_type, text_sample)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(uuid::Uuid::now_v7().to_string())
    .bind(user_id)
    .bind(words)
    .bind(action_type)
    .bind(text_sample)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn get_user_stats(pool: &SqlitePool, user_id: &str) -> Result<UserStats, sqlx::Error> {
    let month_start = chrono::Utc::now().format("%Y-%m-01T00:00:00.000Z").to_string();
    sqlx::query_as::<_, UserStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM text_corrections WHERE user_id = ?1) AS total_corrections,
            (SELECT COUNT(*) FROM text_corrections WHERE user_id = ?1 AND processing_type = 'grammar') AS grammar_corrections,
            (SELECT COUNT(*) FROM text_corrections WHERE user_id = ?1 AND processing_type = 'style') AS style_corrections,
            (SELECT COALESCE(SUM(words_used), 0) FROM word_usage WHERE user_id = ?1) AS total_words_used,
            (SELECT COALESCE(SUM(words_used), 0) FROM word_usage WHERE user_id = ?1 AND created_at >= ?2) AS words_used_this_month
        "#,
    )
    .bind(user_id)
    .bind(month_start)
    .fetch_one(pool)
    .await
}

/// 현재 활성 구독 (종료일이 가장 늦은 것)
pub async fn get_user_subscription(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"
        SELECT id, user_id, plan_id, status, starts_at, ends_at, created_at
        FROM subscriptions
        WHERE user_id = ? AND status = 'active' AND ends_at > ?
        ORDER BY ends_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(now_iso())
    .fetch_optional(pool)
    .await
}

pub async fn check_user_has_active_subscription(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    has_active_subscription(&mut conn, user_id).await
}

/// 트랜잭션 안에서도 쓸 수 있는 활성 구독 확인
pub async fn has_active_subscription(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscriptions WHERE user_id = ? AND status = 'active' AND ends_at > ?",
    )
    .bind(user_id)
    .bind(now_iso())
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

/// 구독을 만들고 구독 크레딧을 지급합니다.
///
/// 기존 활성 구독은 `expired`로 바뀌고, 새 구독은 지금부터 `validity_days` 동안 유효합니다.
/// 크레딧은 구독 종료일에 만료됩니다.
pub async fn create_subscription_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
    plan: &Plan,
    order_id: Option<&str>,
) -> Result<Subscription, AppError> {
    sqlx::query("UPDATE subscriptions SET status = 'expired' WHERE user_id = ? AND status = 'active'")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let id = uuid::Uuid::now_v7().to_string();
    let starts_at = now_iso();
    let ends_at = iso_after_days(plan.validity_days)?;
    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, user_id, plan_id, status, starts_at, ends_at)
        VALUES (?, ?, ?, 'active', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&plan.id)
    .bind(&starts_at)
    .bind(&ends_at)
    .execute(&mut *conn)
    .await?;

    grant_credits(
        &mut *conn,
        user_id,
        CreditType::Subscription,
        plan.words,
        Some(&ends_at),
        order_id,
    )
    .await?;

    let subscription = sqlx::query_as::<_, Subscription>(
        "SELECT id, user_id, plan_id, status, starts_at, ends_at, created_at FROM subscriptions WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(subscription)
}

/// 크레딧 배치 하나를 지급합니다. `expires_at`이 None이면 만료되지 않습니다.
pub async fn grant_credits(
    conn: &mut SqliteConnection,
    user_id: &str,
    credit_type: CreditType,
    words: i64,
    expires_at: Option<&str>,
    order_id: Option<&str>,
) -> Result<WordCredit, sqlx::Error> {
    let id = uuid::Uuid::now_v7().to_string();
    sqlx::query(
        r#"
        INSERT INTO word_credits (id, user_id, credit_type, words_total, words_remaining, expires_at, order_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(credit_type)
    .bind(words)
    .bind(words)
    .bind(expires_at)
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query_as::<_, WordCredit>(
        r#"
        SELECT id, user_id, credit_type, words_total, words_remaining, expires_at, order_id, created_at
        FROM word_credits
        WHERE id = ?
        "#,
    )
    .bind(&id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn list_credits(pool: &SqlitePool, user_id: &str) -> Result<Vec<WordCredit>, sqlx::Error> {
    sqlx::query_as::<_, WordCredit>(
        r#"
        SELECT id, user_id, credit_type, words_total, words_remaining, expires_at, order_id, created_at
        FROM word_credits
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn user(pool: &SqlitePool, id: &str) {
        sqlx::query("INSERT INTO users (id, username, password_hash) VALUES (?, ?, 'x')")
            .bind(id)
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn credit(pool: &SqlitePool, user_id: &str, kind: CreditType, words: i64, expires_at: Option<&str>) -> String {
        let mut conn = pool.acquire().await.unwrap();
        grant_credits(&mut conn, user_id, kind, words, expires_at, None)
            .await
            .unwrap()
            .id
    }

    async fn remaining(pool: &SqlitePool, id: &str) -> i64 {
        sqlx::query_scalar("SELECT words_remaining FROM word_credits WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn priority_deduction_spends_earliest_expiry_first_and_never_expiring_last() {
        let pool = test_pool().await;
        user(&pool, "u1").await;
        let forever = credit(&pool, "u1", CreditType::Topup, 100, None).await;
        let late = credit(&pool, "u1", CreditType::Subscription, 100, Some("2999-12-31T00:00:00.000Z")).await;
        let soon = credit(&pool, "u1", CreditType::Free, 50, Some("2999-01-01T00:00:00.000Z")).await;

        assert!(deduct_words_with_priority(&pool, "u1", 120, "grammar", None).await.unwrap());

        assert_eq!(remaining(&pool, &soon).await, 0);
        assert_eq!(remaining(&pool, &late).await, 30);
        assert_eq!(remaining(&pool, &forever).await, 100);
        assert_eq!(get_user_word_balance(&pool, "u1").await.unwrap(), 130);
    }

    #[tokio::test]
    async fn insufficient_balance_changes_nothing() {
        let pool = test_pool().await;
        user(&pool, "u1").await;
        let batch = credit(&pool, "u1", CreditType::Free, 10, None).await;

        assert!(!deduct_words_with_priority(&pool, "u1", 11, "grammar", Some("नमूना")).await.unwrap());
        assert_eq!(remaining(&pool, &batch).await, 10);

        let usage: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM word_usage")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(usage, 0);
    }

    #[tokio::test]
    async fn expired_batches_do_not_count() {
        let pool = test_pool().await;
        user(&pool, "u1").await;
        credit(&pool, "u1", CreditType::Free, 500, Some("2000-01-01T00:00:00.000Z")).await;
        credit(&pool, "u1", CreditType::Topup, 40, None).await;

        let balance = get_user_word_balance_detailed(&pool, "u1").await.unwrap();
        assert_eq!(balance.total_words_available, 40);
        assert_eq!(balance.free_words, 0);
        assert_eq!(balance.purchased_words, 40);
        assert_eq!(balance.next_expiry_date, None);
        assert!(!balance.has_active_subscription);
    }

    #[tokio::test]
    async fn subscription_grants_credits_until_it_ends() {
        let pool = test_pool().await;
        user(&pool, "u1").await;
        let plan = sqlx::query_as::<_, Plan>(
            "SELECT id, name, plan_type, price_paise, words, validity_days, is_active FROM plans WHERE id = 'basic-monthly'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let subscription = create_subscription_for_user(&mut conn, "u1", &plan, None).await.unwrap();
        drop(conn);

        assert!(check_user_has_active_subscription(&pool, "u1").await.unwrap());
        let balance = get_user_word_balance_detailed(&pool, "u1").await.unwrap();
        assert_eq!(balance.purchased_words, plan.words);
        assert_eq!(balance.next_expiry_date.as_deref(), Some(subscription.ends_at.as_str()));
        assert_eq!(
            get_user_subscription(&pool, "u1").await.unwrap().map(|s| s.id),
            Some(subscription.id)
        );
    }

    #[tokio::test]
    async fn deduction_is_recorded_in_usage_stats() {
        let pool = test_pool().await;
        user(&pool, "u1").await;
        credit(&pool, "u1", CreditType::Free, 100, None).await;

        assert!(deduct_words(&pool, "u1", 25, "style", Some("यह")).await.unwrap());
        let stats = get_user_stats(&pool, "u1").await.unwrap();
        assert_eq!(stats.total_words_used, 25);
        assert_eq!(stats.words_used_this_month, 25);
        assert_eq!(stats.total_corrections, 0);
    }
}
