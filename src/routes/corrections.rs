//! # 교정 라우트 핸들러
//!
//! ## 엔드포인트
//! - `POST   /api/v1/correct/grammar`   → 문법 교정
//! - `POST   /api/v1/correct/style`     → 문체 개선
//! - `POST   /api/v1/highlight`         → 임의 텍스트의 하이라이트 세그먼트
//! - `GET    /api/v1/corrections`       → 내 교정 이력 (`?limit=&offset=`)
//! - `GET    /api/v1/corrections/{id}`  → 교정 이력 하나
//! - `DELETE /api/v1/corrections/{id}`  → 교정 이력 삭제
//!
//! ## 교정 요청 처리 순서
//! 1. 인증
//! 2. 원장 사전 확인 (등급 상한, 잔액). 실패하면 LLM을 부르지 않습니다.
//! 3. 응답 캐시 조회
//! 4. 파이프라인 실행 (같은 사용자의 이전 요청은 중단)
//! 5. 단어 차감, 이력 저장
//! 6. 최종 텍스트, 교정 목록, 입력/출력 하이라이트, 잔액 응답

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::corrections as db_corrections,
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::AppState,
    services::{diff::build_segments, pipeline::count_words},
};

#[derive(Debug, Serialize)]
pub struct CorrectionResponse {
    pub id: String,
    pub processing_type: ProcessingType,
    pub original_text: String,
    pub corrected_text: String,
    pub corrections: Vec<Correction>,
    pub stages: Vec<StageReport>,
    pub input_segments: Vec<HighlightedSegment>,
    pub output_segments: Vec<HighlightedSegment>,
    pub words_used: usize,
    /// 캐시에서 돌려준 결과면 true
    pub cached: bool,
    pub balance: WordBalance,
}

/// `POST /correct/grammar`
pub async fn correct_grammar(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CorrectionRequest>,
) -> Result<Json<CorrectionResponse>, AppError> {
    run_correction(state, auth_user, ProcessingType::Grammar, req.text).await
}

/// `POST /correct/style`
pub async fn correct_style(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CorrectionRequest>,
) -> Result<Json<CorrectionResponse>, AppError> {
    run_correction(state, auth_user, ProcessingType::Style, req.text).await
}

async fn run_correction(
    state: AppState,
    auth_user: AuthUser,
    mode: ProcessingType,
    text: String,
) -> Result<Json<CorrectionResponse>, AppError> {
    let user_id = auth_user.user_id;
    if text.trim().is_empty() {
        return Err(AppError::Validation("Text must not be empty".to_string()));
    }

    let word_count = count_words(&text);
    let word_limit = state.ledger.preflight(&user_id, word_count).await?;

    let (output, cached) = match state.cache.get(mode, &text) {
        Some(output) => {
            tracing::debug!(user_id = %user_id, mode = mode.as_str(), "Correction cache hit");
            (output, true)
        }
        None => {
            let pipeline = state.pipeline.clone();
            let input = text.clone();
            let output = state
                .inflight
                .run(&user_id, async move { pipeline.run(mode, &input, word_limit).await })
                .await??;
            state.cache.insert(mode, &text, output.clone());
            (output, false)
        }
    };

    if !state.ledger.deduct(&user_id, word_count, mode.as_str(), &text).await? {
        let available = state.ledger.fetch_balance(&user_id).await?.total_words_available;
        return Err(AppError::InsufficientBalance {
            required: word_count as i64,
            available,
        });
    }

    let record = db_corrections::insert_correction(
        &state.pool,
        &user_id,
        &text,
        &output.final_text,
        mode,
        &output.corrections,
        word_count as i64,
    )
    .await?;

    let input_segments = build_segments(&text, &output.corrections, Viewpoint::Input);
    let output_segments = build_segments(&output.final_text, &output.corrections, Viewpoint::Output);
    let balance = state.ledger.fetch_balance(&user_id).await?;

    Ok(Json(CorrectionResponse {
        id: record.id,
        processing_type: mode,
        original_text: text,
        corrected_text: output.final_text,
        corrections: output.corrections,
        stages: output.stages,
        input_segments,
        output_segments,
        words_used: word_count,
        cached,
        balance,
    }))
}

#[derive(Debug, Serialize)]
pub struct HighlightResponse {
    pub segments: Vec<HighlightedSegment>,
}

/// `POST /highlight`: 텍스트와 교정 목록으로 세그먼트를 만듭니다. 단어를 차감하지 않습니다.
pub async fn highlight(
    _auth_user: AuthUser,
    Json(req): Json<HighlightRequest>,
) -> Json<HighlightResponse> {
    Json(HighlightResponse {
        segments: build_segments(&req.text, &req.corrections, req.viewpoint),
    })
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub corrections: Vec<TextCorrectionResponse>,
}

/// `GET /corrections`
pub async fn list_corrections(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);
    let records = db_corrections::list_corrections(&state.pool, &auth_user.user_id, limit, offset).await?;

    Ok(Json(HistoryResponse {
        corrections: records.into_iter().map(Into::into).collect(),
    }))
}

/// `GET /corrections/{id}`
pub async fn get_correction(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TextCorrectionResponse>, AppError> {
    let record = db_corrections::get_correction(&state.pool, &id, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(record.into()))
}

/// `DELETE /corrections/{id}`: 본인 이력만 지울 수 있습니다.
pub async fn delete_correction(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !db_corrections::delete_correction(&state.pool, &id, &auth_user.user_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
