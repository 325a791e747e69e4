//! # 교정 응답 캐시
//!
//! 같은 모드로 같은 텍스트를 다시 보내면 LLM을 호출하지 않고 이전 결과를 돌려줍니다.
//! 키는 `(모드, sha256(텍스트), 문자 수)`이며 항목은 TTL이 지나면 버려집니다.
//! 캐시 적중이어도 단어 차감은 그대로 일어납니다.
//!
//! `Arc<Mutex<HashMap<..>>>`: 여러 요청(태스크)이 같은 맵을 공유하는 전형적인 형태입니다.
//! - `Arc`: 스레드 간 공유 가능한 참조 카운트 포인터 (clone해도 맵은 하나)
//! - `Mutex`: 한 번에 하나의 태스크만 맵을 수정하도록 보호

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::models::ProcessingType;
use crate::services::pipeline::PipelineOutput;

/// 이 수를 넘으면 가장 오래된 항목부터 버립니다
const MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    mode: ProcessingType,
    digest: String,
    chars: usize,
}

impl CacheKey {
    pub fn new(mode: ProcessingType, text: &str) -> Self {
        Self {
            mode,
            digest: format!("{:x}", Sha256::digest(text.as_bytes())),
            chars: text.chars().count(),
        }
    }
}

#[derive(Clone)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<CacheKey, (Instant, PipelineOutput)>>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get(&self, mode: ProcessingType, text: &str) -> Option<PipelineOutput> {
        let key = CacheKey::new(mode, text);
        let mut entries = self.entries.lock();
        let (at, output) = entries.get(&key)?.clone();
        if at.elapsed() < self.ttl {
            return Some(output);
        }
        entries.remove(&key);
        None
    }

    pub fn insert(&self, mode: ProcessingType, text: &str, output: PipelineOutput) {
        let mut entries = self.entries.lock();
        if entries.len() >= MAX_ENTRIES {
            let ttl = self.ttl;
            entries.retain(|_, (at, _)| at.elapsed() < ttl);
        }
        if entries.len() >= MAX_ENTRIES {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (at, _))| *at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }
        entries.insert(CacheKey::new(mode, text), (Instant::now(), output));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
