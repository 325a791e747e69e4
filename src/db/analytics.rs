//! 관리자 대시보드 집계 쿼리
//!
//! 매출은 `paid` 상태 주문만 셉니다. 월 구분은 타임스탬프 앞 7자리("YYYY-MM")입니다.

use sqlx::SqlitePool;

use crate::db::now_iso;
use crate::models::{
    AdminUserRow, AnalyticsSummary, CorrectionReportRow, CorrectionTypeCount, MonthlyRevenue,
};

pub async fn get_admin_analytics_summary(pool: &SqlitePool) -> Result<AnalyticsSummary, sqlx::Error> {
    let now = now_iso();
    let month = &now[..7];
    sqlx::query_as::<_, AnalyticsSummary>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE role = 'admin') AS admin_users,
            (SELECT COUNT(*) FROM subscriptions WHERE status = 'active' AND ends_at > ?1) AS active_subscriptions,
            (SELECT COUNT(*) FROM payment_orders WHERE status = 'paid') AS paid_orders,
            (SELECT COALESCE(SUM(amount_paise), 0) FROM payment_orders WHERE status = 'paid') AS total_revenue_paise,
            (SELECT COALESCE(SUM(amount_paise), 0) FROM payment_orders
                WHERE status = 'paid' AND substr(updated_at, 1, 7) = ?2) AS revenue_this_month_paise,
            (SELECT COUNT(*) FROM text_corrections) AS total_corrections,
            (SELECT COALESCE(SUM(words_used), 0) FROM word_usage) AS total_words_processed
        "#,
    )
    .bind(&now)
    .bind(month)
    .fetch_one(pool)
    .await
}

pub async fn revenue_by_month(pool: &SqlitePool) -> Result<Vec<MonthlyRevenue>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyRevenue>(
        r#"
        SELECT substr(updated_at, 1, 7) AS month,
               COUNT(*) AS orders,
               COALESCE(SUM(amount_paise), 0) AS revenue_paise
        FROM payment_orders
        WHERE status = 'paid'
        GROUP BY month
        ORDER BY month
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn corrections_by_type(pool: &SqlitePool) -> Result<Vec<CorrectionTypeCount>, sqlx::Error> {
    sqlx::query_as::<_, CorrectionTypeCount>(
        r#"
        SELECT processing_type,
               COUNT(*) AS corrections,
               COALESCE(SUM(words_used), 0) AS words_used
        FROM text_corrections
        GROUP BY processing_type
        ORDER BY processing_type
        "#,
    )
    .fetch_all(pool)
    .await
}

/// 잔액과 교정 횟수를 포함한 사용자 목록
pub async fn list_users_with_stats(pool: &SqlitePool) -> Result<Vec<AdminUserRow>, sqlx::Error> {
    sqlx::query_as::<_, AdminUserRow>(
        r#"
        SELECT u.id, u.username, u.email, u.role,
               (SELECT COALESCE(SUM(c.words_remaining), 0) FROM word_credits c
                 WHERE c.user_id = u.id AND (c.expires_at IS NULL OR c.expires_at > ?)) AS words_available,
               (SELECT COUNT(*) FROM text_corrections t WHERE t.user_id = u.id) AS total_corrections,
               u.created_at
        FROM users u
        ORDER BY u.created_at DESC
        "#,
    )
    .bind(now_iso())
    .fetch_all(pool)
    .await
}

/// 최근 교정 기록. 원문은 앞 80자만 싣습니다.
pub async fn correction_report(pool: &SqlitePool, limit: i64) -> Result<Vec<CorrectionReportRow>, sqlx::Error> {
    sqlx::query_as::<_, CorrectionReportRow>(
        r#"
        SELECT t.id, u.username, t.processing_type, t.words_used,
               substr(t.original_text, 1, 80) AS text_sample, t.created_at
        FROM text_corrections t
        JOIN users u ON u.id = t.user_id
        ORDER BY t.created_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn summary_counts_only_paid_orders() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO users (id, username, password_hash, role) VALUES ('a', 'admin', 'x', 'admin'), ('b', 'bob', 'x', 'user')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO payment_orders (id, user_id, plan_id, gateway, gateway_order_id, amount_paise, status)
            VALUES ('o1', 'b', 'basic-monthly', 'razorpay', 'order_1', 19900, 'paid'),
                   ('o2', 'b', 'topup-5k', 'cashfree', 'cf_2', 9900, 'rejected')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let summary = get_admin_analytics_summary(&pool).await.unwrap();
        assert_eq!(summary.total_users, 2);
        assert_eq!(summary.admin_users, 1);
        assert_eq!(summary.paid_orders, 1);
        assert_eq!(summary.total_revenue_paise, 19900);
        assert_eq!(summary.revenue_this_month_paise, 19900);

        let months = revenue_by_month(&pool).await.unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].revenue_paise, 19900);
    }
}
