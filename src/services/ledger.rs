//! # 단어 크레딧 원장(Word-Credit Ledger) 서비스
//!
//! 교정 요청마다 두 가지 상한을 확인합니다.
//! 1. 등급 상한: 무료 사용자와 구독 사용자의 1회 교정 단어 수
//! 2. 잔액: 만료되지 않은 크레딧의 합계
//!
//! 잔액은 사용자별로 캐시하며, 차감이나 충전 직후 무효화합니다.
//! 원장의 진실은 언제나 DB(`db::ledger`)에 있습니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use sqlx::SqlitePool;

use crate::config::WordPolicy;
use crate::db::ledger as db_ledger;
use crate::error::AppError;
use crate::models::{Tier, WordBalance};

/// 사용 기록에 남기는 원문 앞부분 길이(문자)
const TEXT_SAMPLE_CHARS: usize = 100;

#[derive(Clone)]
pub struct CreditLedger {
    pool: SqlitePool,
    policy: WordPolicy,
    ttl: Duration,
    balances: Arc<RwLock<HashMap<String, (Instant, WordBalance)>>>,
}

impl CreditLedger {
    pub fn new(pool: SqlitePool, policy: WordPolicy, ttl: Duration) -> Self {
        Self {
            pool,
            policy,
            ttl,
            balances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn policy(&self) -> WordPolicy {
        self.policy
    }

    /// 등급별 1회 교정 단어 상한
    pub fn word_limit(&self, tier: Tier) -> usize {
        match tier {
            Tier::Free => self.policy.free_word_limit,
            Tier::Subscribed => self.policy.subscribed_word_limit,
        }
    }

    pub async fn fetch_balance(&self, user_id: &str) -> Result<WordBalance, AppError> {
        let cached = self
            .balances
            .read()
            .get(user_id)
            .filter(|(at, _)| at.elapsed() < self.ttl)
            .map(|(_, balance)| balance.clone());
        if let Some(balance) = cached {
            return Ok(balance);
        }

        let balance = db_ledger::get_user_word_balance_detailed(&self.pool, user_id).await?;
        self.balances
            .write()
            .insert(user_id.to_string(), (Instant::now(), balance.clone()));
        Ok(balance)
    }

    /// 두 상한을 모두 통과하면 true
    pub async fn check_limit(&self, user_id: &str, word_count: usize) -> Result<bool, AppError> {
        let balance = self.fetch_balance(user_id).await?;
        Ok(word_count <= self.word_limit(tier_of(&balance))
            && balance.total_words_available >= word_count as i64)
    }

    /// 교정 전에 호출합니다. 통과하면 이 사용자의 1회 단어 상한을 돌려줍니다.
    ///
    /// 상한 초과는 `WordLimitExceeded`, 잔액 부족은 `InsufficientBalance`로 구분됩니다.
    pub async fn preflight(&self, user_id: &str, word_count: usize) -> Result<usize, AppError> {
        let balance = self.fetch_balance(user_id).await?;
        let limit = self.word_limit(tier_of(&balance));

        if word_count > limit {
            return Err(AppError::WordLimitExceeded { word_count, limit });
        }
        let required = word_count as i64;
        if balance.total_words_available < required {
            return Err(AppError::InsufficientBalance {
                required,
                available: balance.total_words_available,
            });
        }
        Ok(limit)
    }

    /// 먼저 만료되는 크레딧부터 차감합니다. 잔액이 모자라면 false
    pub async fn deduct(
        &self,
        user_id: &str,
        word_count: usize,
        action_type: &str,
        text: &str,
    ) -> Result<bool, AppError> {
        let sample: String = text.chars().take(TEXT_SAMPLE_CHARS).collect();
        let deducted = db_ledger::deduct_words_with_priority(
            &self.pool,
            user_id,
            word_count as i64,
            action_type,
            Some(&sample),
        )
        .await?;
        self.invalidate(user_id);

        if deducted {
            tracing::info!(user_id, word_count, action_type, "Words deducted");
        } else {
            tracing::warn!(user_id, word_count, "Deduction failed, balance changed since preflight");
        }
        Ok(deducted)
    }

    /// 크레딧이 바뀐 뒤 호출합니다.
    pub fn invalidate(&self, user_id: &str) {
        self.balances.write().remove(user_id);
    }
}

pub fn tier_of(balance: &WordBalance) -> Tier {
    if balance.has_active_subscription {
        Tier::Subscribed
    } else {
        Tier::Free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::CreditType;

    async fn ledger_with_user(words: i64) -> CreditLedger {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO users (id, username, password_hash) VALUES ('u1', 'u1', 'x')")
            .execute(&pool)
            .await
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        db_ledger::grant_credits(&mut conn, "u1", CreditType::Free, words, None, None)
            .await
            .unwrap();
        drop(conn);
        CreditLedger::new(pool, WordPolicy::default(), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn free_tier_limit_is_enforced_before_balance() {
        let ledger = ledger_with_user(5000).await;
        let err = ledger.preflight("u1", 1001).await.unwrap_err();
        assert!(matches!(err, AppError::WordLimitExceeded { word_count: 1001, limit: 1000 }));
        assert_eq!(ledger.preflight("u1", 1000).await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn low_balance_is_reported_separately() {
        let ledger = ledger_with_user(100).await;
        let err = ledger.preflight("u1", 101).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance { required: 101, available: 100 }));
        assert!(!ledger.check_limit("u1", 101).await.unwrap());
        assert!(ledger.check_limit("u1", 100).await.unwrap());
    }

    #[tokio::test]
    async fn deduction_refreshes_cached_balance() {
        let ledger = ledger_with_user(100).await;
        assert_eq!(ledger.fetch_balance("u1").await.unwrap().total_words_available, 100);

        assert!(ledger.deduct("u1", 40, "grammar", "कुछ पाठ").await.unwrap());
        assert_eq!(ledger.fetch_balance("u1").await.unwrap().total_words_available, 60);

        assert!(!ledger.deduct("u1", 61, "grammar", "कुछ पाठ").await.unwrap());
        assert_eq!(ledger.fetch_balance("u1").await.unwrap().total_words_available, 60);
    }
}
