//! # 단어 사전 치환(Word Dictionary Matcher) 서비스
//!
//! 고정된 (틀린 표기, 올바른 표기) 힌디어 단어 쌍 목록으로 텍스트를 치환합니다.
//!
//! ## 동작 방식
//! 1. 규칙 목록을 정해진 순서대로 순회합니다.
//! 2. 현재 텍스트에 `original`이 부분 문자열로 들어 있으면 **모든** 출현을 `replacement`로 바꿉니다.
//! 3. 일치한 규칙마다 교정 기록을 **하나** 남깁니다 (출현 횟수와 무관).
//!
//! 뒤쪽 규칙은 앞쪽 규칙이 이미 바꾼 텍스트를 다시 볼 수 있습니다.
//!
//! ## 주의: 단어 경계를 보지 않습니다
//! 리터럴 부분 문자열 비교이므로 규칙이 더 긴 단어 안에서도 일치할 수 있습니다.
//! (예: `आधीन → अधीन` 규칙은 `पराधीन` 안에서도 일치)
//! 기존 동작을 그대로 유지하며, 단어 경계 매칭으로 바꿀지는 미결 사항입니다.

use crate::models::{Correction, CorrectionSource, CorrectionType};

/// 사전 규칙 하나: `original`을 `replacement`로 바꿉니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordReplacementRule {
    pub original: String,
    pub replacement: String,
}

impl WordReplacementRule {
    pub fn new(original: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            replacement: replacement.into(),
        }
    }
}

/// 사전 치환 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryOutcome {
    pub corrected_text: String,
    pub applied_corrections: Vec<Correction>,
}

/// 기본 내장 규칙: 자주 틀리는 힌디어 표기
///
/// `(틀린 표기, 올바른 표기)` 순서입니다.
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("क्रिप्या", "कृपया"),
    ("आर्शीवाद", "आशीर्वाद"),
    ("उज्जवल", "उज्ज्वल"),
    ("अन्तराष्ट्रीय", "अंतरराष्ट्रीय"),
    ("परिक्षा", "परीक्षा"),
    ("कवियत्री", "कवयित्री"),
    ("उपरोक्त", "उपर्युक्त"),
    ("पूज्यनीय", "पूजनीय"),
    ("सौंदर्यता", "सौंदर्य"),
    ("अत्याधिक", "अत्यधिक"),
    ("प्रदर्शिनी", "प्रदर्शनी"),
    ("श्रीमति", "श्रीमती"),
    ("आधीन", "अधीन"),
    ("अनाधिकार", "अनधिकार"),
    ("बुद्धवार", "बुधवार"),
    ("सन्यासी", "संन्यासी"),
    ("दुरावस्था", "दुरवस्था"),
    ("ज्योत्सना", "ज्योत्स्ना"),
    ("इसलिये", "इसलिए"),
    ("चाहिये", "चाहिए"),
    ("लिये", "लिए"),
    ("गयी", "गई"),
    ("नयी", "नई"),
];

/// 정적 단어 치환 사전
///
/// 시작 시 한 번 만들어지고 세션 동안 변하지 않습니다.
/// `apply()`는 부수효과가 없는 순수 함수입니다.
#[derive(Debug, Clone)]
pub struct WordDictionary {
    rules: Vec<WordReplacementRule>,
}

impl WordDictionary {
    /// 주어진 규칙으로 사전을 만듭니다. `original`이 빈 규칙은 버립니다.
    pub fn new(rules: Vec<WordReplacementRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| !rule.original.is_empty())
            .collect();
        Self { rules }
    }

    /// 내장 힌디어 표기 규칙으로 사전을 만듭니다.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_RULES
                .iter()
                .map(|(original, replacement)| WordReplacementRule::new(*original, *replacement))
                .collect(),
        )
    }

    pub fn rules(&self) -> &[WordReplacementRule] {
        &self.rules
    }

    /// 사전 치환을 한 번 수행합니다 (dictionary pass).
    ///
    /// 교정 기록에는 `source = dictionary`가 붙습니다. `step` 태그는 호출한 파이프라인이 붙입니다.
    pub fn apply(&self, text: &str) -> DictionaryOutcome {
        let mut corrected_text = text.to_string();
        let mut applied_corrections = Vec::new();

        for rule in &self.rules {
            if !corrected_text.contains(&rule.original) {
                continue;
            }
            corrected_text = corrected_text.replace(&rule.original, &rule.replacement);

            let mut correction = Correction::new(
                rule.original.clone(),
                rule.replacement.clone(),
                format!("'{}' की सही वर्तनी '{}' है", rule.original, rule.replacement),
                CorrectionType::Spelling,
            );
            correction.source = Some(CorrectionSource::Dictionary);
            applied_corrections.push(correction);
        }

        DictionaryOutcome {
            corrected_text,
            applied_corrections,
        }
    }
}

impl Default for WordDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}
