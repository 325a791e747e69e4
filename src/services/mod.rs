//! # 서비스 계층
//!
//! HTTP와 무관한 도메인 로직을 모아둔 모듈입니다.
//!
//! - `dictionary`: 고정 힌디어 표기 사전 치환
//! - `llm`: OpenAI 호환 chat-completion 제공자 체인과 교정/문체 호출
//! - `pipeline`: 사전과 LLM 단계를 순서대로 잇는 교정 파이프라인
//! - `diff`: 하이라이트 세그먼트와 단어 단위 비교
//! - `ledger`: 단어 상한/잔액 확인과 차감
//! - `cache`: 교정 응답 캐시
//! - `inflight`: 사용자별 진행 중 작업 교체
//! - `payments`, `billing`: 결제 게이트웨이 연동과 결제 완료 처리
//! - `export`: CSV/JSON/PDF 내보내기

pub mod billing;
pub mod cache;
pub mod dictionary;
pub mod diff;
pub mod export;
pub mod inflight;
pub mod ledger;
pub mod llm;
pub mod payments;
pub mod pipeline;
