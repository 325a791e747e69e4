//! # 교정(Correction) 모델 정의
//!
//! 교정 파이프라인의 각 단계가 만들어내는 교정 기록과,
//! 화면 하이라이트용 세그먼트, 이력(history) 레코드를 정의합니다.
//!
//! ## 생명주기
//! - `Correction`: 한 번의 교정 실행 안에서만 누적되는 추가 전용(append-only) 목록
//! - `HighlightedSegment`: 저장하지 않고 매 요청마다 다시 계산
//! - `TextCorrection`: 교정 실행이 끝나면 한 번 저장되고 이후 변경되지 않음

use serde::{Deserialize, Serialize};

/// 교정 종류
///
/// `#[serde(rename_all = "lowercase")]`: JSON에서는 `"grammar"`, `"spelling"`처럼
/// 소문자로 직렬화됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionType {
    #[default]
    Grammar,
    Spelling,
    Punctuation,
    Syntax,
    Vocabulary,
}

impl CorrectionType {
    /// LLM이 돌려준 자유 형식 문자열을 교정 종류로 변환합니다.
    /// 알 수 없는 값은 `Grammar`로 취급합니다.
    pub fn parse_loose(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "spelling" | "orthography" => Self::Spelling,
            "punctuation" => Self::Punctuation,
            "syntax" | "structure" => Self::Syntax,
            "vocabulary" | "style" | "word-choice" | "word_choice" => Self::Vocabulary,
            _ => Self::Grammar,
        }
    }
}

/// 교정의 출처(provenance)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionSource {
    /// 정적 단어 사전 치환
    Dictionary,
    /// 외부 LLM 응답 (또는 LLM 출력에 대한 단어 비교)
    Gpt,
}

/// 하나의 "틀린 표현 → 올바른 표현" 교정 기록
///
/// 생성된 뒤에는 수정하지 않습니다. 표시(하이라이트, 목록, 통계)에만 쓰입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub incorrect: String,
    pub correct: String,
    #[serde(default)]
    pub reason: String,
    #[serde(rename = "type", default)]
    pub kind: CorrectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CorrectionSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl Correction {
    pub fn new(
        incorrect: impl Into<String>,
        correct: impl Into<String>,
        reason: impl Into<String>,
        kind: CorrectionType,
    ) -> Self {
        Self {
            incorrect: incorrect.into(),
            correct: correct.into(),
            reason: reason.into(),
            kind,
            source: None,
            step: None,
        }
    }

    /// 출처와 단계 태그를 붙인 사본을 돌려줍니다.
    pub fn tagged(mut self, source: CorrectionSource, step: &str) -> Self {
        self.source = Some(source);
        self.step = Some(step.to_string());
        self
    }
}

/// 처리 모드: 문법 교정 또는 문체 개선
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProcessingType {
    Grammar,
    Style,
}

impl ProcessingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grammar => "grammar",
            Self::Style => "style",
        }
    }
}

/// 하이라이트 기준 시점: 입력(틀린 표현 강조) 또는 출력(고친 표현 강조)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewpoint {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Incorrect,
    Correct,
    Normal,
}

/// 세그먼트 위치 (문자 단위 오프셋, 끝은 미포함)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

/// 원문을 빈틈없이 나눈 조각 하나
///
/// 모든 세그먼트의 `text`를 순서대로 이어 붙이면 원문과 정확히 같아야 합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightedSegment {
    pub text: String,
    pub is_highlighted: bool,
    #[serde(rename = "type")]
    pub kind: SegmentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_index: Option<usize>,
    pub position: Position,
}

/// 교정 이력: DB의 `text_corrections` 테이블 한 행
///
/// `corrections_data`는 `Correction` 목록을 JSON 문자열로 저장한 것입니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TextCorrection {
    pub id: String,
    pub user_id: String,
    pub original_text: String,
    pub corrected_text: String,
    pub processing_type: ProcessingType,
    #[serde(skip_serializing)]
    pub corrections_data: String,
    pub words_used: i64,
    pub created_at: String,
}

impl TextCorrection {
    /// 저장된 JSON을 교정 목록으로 되돌립니다. 손상된 데이터는 빈 목록이 됩니다.
    pub fn corrections(&self) -> Vec<Correction> {
        serde_json::from_str(&self.corrections_data).unwrap_or_default()
    }
}

/// 이력 조회 응답 (교정 목록을 펼친 형태)
#[derive(Debug, Serialize)]
pub struct TextCorrectionResponse {
    #[serde(flatten)]
    pub record: TextCorrection,
    pub corrections: Vec<Correction>,
}

impl From<TextCorrection> for TextCorrectionResponse {
    fn from(record: TextCorrection) -> Self {
        let corrections = record.corrections();
        Self { record, corrections }
    }
}

/// `POST /correct/grammar`, `POST /correct/style` 요청 본문
#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    pub text: String,
}

/// `POST /highlight` 요청 본문
#[derive(Debug, Deserialize)]
pub struct HighlightRequest {
    pub text: String,
    #[serde(default)]
    pub corrections: Vec<Correction>,
    pub viewpoint: Viewpoint,
}

/// 파이프라인 단계별 교정 개수 보고
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub step: String,
    pub corrections: usize,
}
