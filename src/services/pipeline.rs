//! # 다단계 교정 파이프라인(Multi-Pass Correction Orchestrator)
//!
//! 사전 치환과 LLM 호출을 정해진 순서로 실행하며, 각 단계의 교정 기록에
//! 출처(`source`)와 단계(`step`) 태그를 붙여 누적합니다.
//!
//! ## 상태 흐름 (분기 없음, 에러 시 중단)
//! ```text
//! 문법: RAW → dictionary-1 → gpt → dictionary-2 → dictionary-final → DONE
//! 문체: RAW → gpt-style → dictionary → diff → DONE
//! ```
//!
//! 각 단계는 이전 단계의 출력 텍스트를 입력으로 받으므로 반드시 순차 실행합니다.
//! 어느 단계든 실패하면 전체가 실패하고 중간 결과는 버립니다. 재시도는 호출자의 몫입니다.
//!
//! ## 사전 조건
//! 빈 입력과 단어 수 상한 초과는 **네트워크 호출 전에** 거부합니다.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{Correction, CorrectionSource, ProcessingType, StageReport};
use crate::services::diff::word_diff;
use crate::services::dictionary::WordDictionary;
use crate::services::llm::{LlmCorrector, LlmError};

/// 단계 태그
pub mod steps {
    pub const DICTIONARY_FIRST: &str = "dictionary-1";
    pub const GPT: &str = "gpt";
    pub const DICTIONARY_SECOND: &str = "dictionary-2";
    pub const DICTIONARY_FINAL: &str = "dictionary-final";
    pub const GPT_STYLE: &str = "gpt-style";
    pub const DICTIONARY: &str = "dictionary";
    pub const DIFF: &str = "diff";
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Text has {word_count} words, the limit is {limit}")]
    WordLimitExceeded { word_count: usize, limit: usize },

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// 파이프라인 최종 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub final_text: String,
    /// 모든 단계의 교정 기록을 단계 순서대로 이은 목록
    pub corrections: Vec<Correction>,
    /// 단계별 교정 개수
    pub stages: Vec<StageReport>,
}

/// 공백 기준 단어 수
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 사전 조건 검사. 통과하면 단어 수를 돌려줍니다.
pub fn validate_input(text: &str, word_limit: usize) -> Result<usize, PipelineError> {
    if text.trim().is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let word_count = count_words(text);
    if word_count > word_limit {
        return Err(PipelineError::WordLimitExceeded {
            word_count,
            limit: word_limit,
        });
    }
    Ok(word_count)
}

/// 단계 사이를 흐르는 상태
struct Run {
    text: String,
    corrections: Vec<Correction>,
    stages: Vec<StageReport>,
}

impl Run {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            corrections: Vec::new(),
            stages: Vec::new(),
        }
    }

    /// 단계 조각을 태그를 붙여 누적합니다.
    fn record(&mut self, step: &str, source: CorrectionSource, fragment: Vec<Correction>) {
        tracing::debug!(step, corrections = fragment.len(), "Correction stage finished");
        self.stages.push(StageReport {
            step: step.to_string(),
            corrections: fragment.len(),
        });
        self.corrections
            .extend(fragment.into_iter().map(|c| c.tagged(source, step)));
    }

    fn finish(self) -> PipelineOutput {
        PipelineOutput {
            final_text: self.text,
            corrections: self.corrections,
            stages: self.stages,
        }
    }
}

/// 교정 파이프라인
#[derive(Clone)]
pub struct CorrectionPipeline {
    dictionary: Arc<WordDictionary>,
    llm: LlmCorrector,
}

impl CorrectionPipeline {
    pub fn new(dictionary: Arc<WordDictionary>, llm: LlmCorrector) -> Self {
        Self { dictionary, llm }
    }

    /// 입력을 검증한 뒤 모드에 맞는 파이프라인을 실행합니다.
    pub async fn run(
        &self,
        mode: ProcessingType,
        text: &str,
        word_limit: usize,
    ) -> Result<PipelineOutput, PipelineError> {
        validate_input(text, word_limit)?;

        let output = match mode {
            ProcessingType::Grammar => self.run_grammar(text).await?,
            ProcessingType::Style => self.run_style(text).await?,
        };

        tracing::info!(
            mode = mode.as_str(),
            corrections = output.corrections.len(),
            "Correction pipeline finished"
        );
        Ok(output)
    }

    fn dictionary_pass(&self, run: &mut Run, step: &str) {
        let outcome = self.dictionary.apply(&run.text);
        run.text = outcome.corrected_text;
        run.record(step, CorrectionSource::Dictionary, outcome.applied_corrections);
    }

    async fn run_grammar(&self, text: &str) -> Result<PipelineOutput, PipelineError> {
        let mut run = Run::new(text);

        self.dictionary_pass(&mut run, steps::DICTIONARY_FIRST);

        let llm_input = run.text.clone();
        let result = self.llm.correct(&llm_input).await?;
        // LLM이 교정 목록을 주지 않으면 입력/출력을 단어 단위로 비교해 만듭니다
        let fragment = if result.corrections.is_empty() {
            word_diff(&llm_input, &result.corrected_text)
        } else {
            result.corrections
        };
        run.text = result.corrected_text;
        run.record(steps::GPT, CorrectionSource::Gpt, fragment);

        self.dictionary_pass(&mut run, steps::DICTIONARY_SECOND);
        // 마지막 확인 패스
        self.dictionary_pass(&mut run, steps::DICTIONARY_FINAL);

        Ok(run.finish())
    }

    async fn run_style(&self, text: &str) -> Result<PipelineOutput, PipelineError> {
        let mut run = Run::new(text);

        let llm_input = run.text.clone();
        let result = self.llm.enhance_style(&llm_input).await?;
        let llm_output = result.enhanced_text.clone();
        let supplied = !result.enhancements.is_empty();
        run.text = result.enhanced_text;
        run.record(steps::GPT_STYLE, CorrectionSource::Gpt, result.enhancements);

        self.dictionary_pass(&mut run, steps::DICTIONARY);

        let synthesized = if supplied {
            Vec::new()
        } else {
            word_diff(&llm_input, &llm_output)
        };
        run.record(steps::DIFF, CorrectionSource::Gpt, synthesized);

        Ok(run.finish())
    }
}
