//! # LLM 교정 클라이언트
//!
//! 외부 chat-completion API(OpenAI, Grok/xAI)에 교정/문체 개선을 요청합니다.
//!
//! ## 구성
//! - `CompletionProvider`: 제공자 어댑터 공통 인터페이스
//! - `OpenAiCompatibleProvider`: `{base_url}/chat/completions` 호출. 설정된 모델 목록을 순서대로 시도
//! - `ProviderChain`: 어댑터 목록을 순서대로 시도. 모두 실패하면 `AllProvidersFailed`
//! - `LlmCorrector`: 고정 시스템 프롬프트로 요청하고 응답(일반 텍스트 또는 JSON)을 해석
//!
//! ## 실패 처리
//! - 2xx가 아닌 응답 → `LlmError::Status` (다음 모델/제공자로 넘어감)
//! - JSON 파싱 실패 → 에러가 아니라 응답 전체를 교정문으로 취급
//! - 재시도/지수 백오프는 없습니다. 모델 목록과 제공자 목록이 유일한 대체 경로입니다.
//! - 요청 타임아웃은 `reqwest::Client`에 설정된 값(`LLM_TIMEOUT_SECS`)을 따릅니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{LlmSettings, ProviderConfig};
use crate::models::{Correction, CorrectionSource, CorrectionType};

/// LLM 호출 에러
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No LLM provider is configured")]
    NoProvider,

    #[error("All providers failed: {0}")]
    AllProvidersFailed(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// chat-completion 메시지 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// 생성 파라미터
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 4000,
        }
    }
}

/// LLM 제공자 어댑터
///
/// 성공하면 첫 번째 choice의 메시지 본문을 그대로 돌려줍니다.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, LlmError>;
}

// ── OpenAI 호환 API 타입 ──

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI 형식의 chat-completion 제공자 (OpenAI, Grok/xAI 공용)
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: ProviderConfig, timeout: Duration) -> Result<Self, LlmError> {
        if config.models.is_empty() {
            return Err(LlmError::Configuration(format!(
                "Provider {} has no models configured",
                config.name
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// 모델 하나로 요청을 한 번 보냅니다.
    async fn request_model(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                provider: format!("{}/{}", self.config.name, model),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Response has no choices".to_string()))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    /// 설정된 모델을 순서대로 시도합니다. 하나라도 성공하면 그 결과를 돌려줍니다.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, LlmError> {
        let mut last_error = None;

        for model in &self.config.models {
            match self.request_model(model, messages, params).await {
                Ok(content) => {
                    tracing::debug!(provider = %self.config.name, model = %model, "LLM request succeeded");
                    return Ok(content);
                }
                Err(e) => {
                    tracing::warn!(provider = %self.config.name, model = %model, "LLM model failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            LlmError::Configuration(format!("Provider {} has no models", self.config.name))
        }))
    }
}

/// 우선순위 순서의 제공자 체인
///
/// 첫 번째 성공한 제공자의 결과를 돌려주고, 전부 실패하면 시도 내역을 모아 에러로 돌려줍니다.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn CompletionProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>) -> Self {
        Self { providers }
    }

    /// 설정의 제공자 목록(OpenAI → Grok)으로 체인을 만듭니다.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let providers = settings
            .providers
            .iter()
            .map(|config| {
                OpenAiCompatibleProvider::new(config.clone(), settings.timeout)
                    .map(|p| Arc::new(p) as Arc<dyn CompletionProvider>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(providers))
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

#[async_trait]
impl CompletionProvider for ProviderChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, LlmError> {
        if self.providers.is_empty() {
            return Err(LlmError::NoProvider);
        }

        let mut failures = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match provider.complete(messages, params).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), "Falling back to next provider: {}", e);
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(LlmError::AllProvidersFailed(failures.join("; ")))
    }
}

// ── 프롬프트 ──

const GRAMMAR_SYSTEM_PROMPT: &str = r#"You are an expert Hindi proofreader.
Correct grammar, spelling (matra, nukta, anusvara/chandrabindu), gender and number agreement,
postpositions, punctuation (use the purna viram "।") and sentence structure of the Hindi text you receive.
Rules:
1. Preserve the meaning, tone and the writer's vocabulary; do not paraphrase.
2. Do not translate; keep English words and numbers as they are.
3. Keep line breaks and paragraph order.
4. Reply ONLY with JSON of the form
   {"correctedText": "...", "corrections": [{"incorrect": "...", "correct": "...", "reason": "...", "type": "grammar|spelling|punctuation|syntax|vocabulary"}]}
   The reason must be written in Hindi. If nothing needs fixing, return the text unchanged with an empty list."#;

const STYLE_SYSTEM_PROMPT: &str = r#"You are an expert Hindi editor.
Improve the style of the Hindi text you receive: clearer sentence flow, precise and idiomatic word choice,
consistent register, and removal of redundancy, while keeping the meaning and every fact intact.
Rules:
1. Do not translate and do not add new information.
2. Keep line breaks and paragraph order.
3. Reply ONLY with JSON of the form
   {"enhancedText": "...", "enhancements": [{"incorrect": "...", "correct": "...", "reason": "...", "type": "vocabulary|syntax|grammar|punctuation|spelling"}]}
   The reason must be written in Hindi."#;

/// LLM 문법 교정 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmCorrection {
    pub corrected_text: String,
    pub corrections: Vec<Correction>,
}

/// LLM 문체 개선 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleEnhancement {
    pub enhanced_text: String,
    pub enhancements: Vec<Correction>,
}

/// LLM이 돌려주는 JSON 봉투. 문법/문체 두 형식을 모두 받아들입니다.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(alias = "correctedText", alias = "enhancedText", alias = "corrected_text", alias = "enhanced_text")]
    text: String,
    #[serde(default, alias = "corrections", alias = "enhancements")]
    items: Vec<RawCorrection>,
}

#[derive(Debug, Deserialize)]
struct RawCorrection {
    #[serde(default, alias = "original")]
    incorrect: String,
    #[serde(default, alias = "corrected", alias = "suggestion")]
    correct: String,
    #[serde(default, alias = "explanation")]
    reason: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl From<RawCorrection> for Correction {
    fn from(raw: RawCorrection) -> Self {
        let kind = raw
            .kind
            .as_deref()
            .map(CorrectionType::parse_loose)
            .unwrap_or_default();
        let mut correction = Correction::new(raw.incorrect, raw.correct, raw.reason, kind);
        correction.source = Some(CorrectionSource::Gpt);
        correction
    }
}

/// ```json ... ``` 코드 펜스를 벗겨냅니다.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // 첫 줄의 언어 표시(json 등)를 건너뜁니다
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// LLM 응답 본문을 (텍스트, 교정 목록)으로 해석합니다.
///
/// JSON이 아니면 응답 전체를 텍스트로 보고 교정 목록은 비웁니다.
/// 이때 코드 펜스가 없으면 앞뒤 공백과 줄바꿈을 포함한 원문을 그대로 돌려줍니다.
/// 본문이 비어 있을 때만 에러입니다.
fn parse_envelope(raw: &str) -> Result<(String, Vec<Correction>), LlmError> {
    let fenced = raw.trim_start().starts_with("```");
    let content = strip_code_fence(raw);
    if content.is_empty() {
        return Err(LlmError::InvalidResponse("Empty completion".to_string()));
    }

    match serde_json::from_str::<Envelope>(content) {
        Ok(envelope) => {
            let corrections = envelope
                .items
                .into_iter()
                .filter(|item| !(item.incorrect.is_empty() && item.correct.is_empty()))
                .map(Correction::from)
                .collect();
            Ok((envelope.text, corrections))
        }
        Err(e) => {
            tracing::debug!("LLM response is not a JSON envelope, using it as plain text: {}", e);
            let text = if fenced { content } else { raw };
            Ok((text.to_string(), Vec::new()))
        }
    }
}

/// 고정 프롬프트로 LLM에 교정/문체 개선을 요청하는 클라이언트
#[derive(Clone)]
pub struct LlmCorrector {
    provider: Arc<dyn CompletionProvider>,
    params: CompletionParams,
}

impl LlmCorrector {
    pub fn new(provider: Arc<dyn CompletionProvider>, params: CompletionParams) -> Self {
        Self { provider, params }
    }

    /// 문법 교정 (LLM pass)
    pub async fn correct(&self, text: &str) -> Result<LlmCorrection, LlmError> {
        let messages = [ChatMessage::system(GRAMMAR_SYSTEM_PROMPT), ChatMessage::user(text)];
        let raw = self.provider.complete(&messages, self.params).await?;
        let (corrected_text, corrections) = parse_envelope(&raw)?;
        Ok(LlmCorrection {
            corrected_text,
            corrections,
        })
    }

    /// 문체 개선 (LLM pass)
    pub async fn enhance_style(&self, text: &str) -> Result<StyleEnhancement, LlmError> {
        let messages = [ChatMessage::system(STYLE_SYSTEM_PROMPT), ChatMessage::user(text)];
        let raw = self.provider.complete(&messages, self.params).await?;
        let (enhanced_text, enhancements) = parse_envelope(&raw)?;
        Ok(StyleEnhancement {
            enhanced_text,
            enhancements,
        })
    }
}
