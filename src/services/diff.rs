//! # 텍스트 비교와 하이라이트(Diff & Highlight) 서비스
//!
//! 두 가지 기능을 제공합니다:
//! - `build_segments()`: 교정 목록을 원문에서 찾아 강조/일반 세그먼트로 나눕니다.
//! - `word_diff()`: 교정 목록이 없을 때 두 문자열을 단어 위치별로 비교해 교정 기록을 만듭니다.
//!
//! ## 세그먼트 불변식
//! 세그먼트는 원문을 빈틈도 겹침도 없이 나누며, `text`를 순서대로 이으면 원문이 됩니다.
//! `position`은 **문자(char) 단위** 오프셋입니다. (바이트 오프셋이 아님)
//!
//! ## 매칭 단계 (첫 번째로 결과가 나온 단계에서 멈춤)
//! 1. 정확한 부분 문자열
//! 2. 앞뒤 공백을 제거한 문자열
//! 3. 유니코드 정규화(NFC, NFD)한 문자열
//! 4. 단어 사이 공백을 유연하게 허용하는 정규식

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Correction, CorrectionType, HighlightedSegment, Position, SegmentType, Viewpoint};

/// 다른 교정이 이미 기록한 일치와 시작/끝이 이 문자 수 이내로 가까우면 중복으로 봅니다.
/// 같은 교정의 반복 출현(예: "है है")끼리는 비교하지 않습니다.
const MATCH_TOLERANCE: usize = 3;

/// 원문 안에서 찾은 일치 범위 (바이트 오프셋)
#[derive(Debug, Clone, Copy)]
struct MatchRange {
    start: usize,
    end: usize,
    start_char: usize,
    end_char: usize,
    correction_index: usize,
}

/// 교정 목록을 원문에서 찾아 하이라이트 세그먼트를 만듭니다.
///
/// - `Viewpoint::Input`: 원문에서 `incorrect`를 찾아 `incorrect` 세그먼트로 표시
/// - `Viewpoint::Output`: 교정문에서 `correct`를 찾아 `correct` 세그먼트로 표시
///
/// 겹치는 일치는 시작 위치 순으로 먼저 온 것만 남깁니다.
pub fn build_segments(
    text: &str,
    corrections: &[Correction],
    viewpoint: Viewpoint,
) -> Vec<HighlightedSegment> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<MatchRange> = Vec::new();
    for (index, correction) in corrections.iter().enumerate() {
        let needle = match viewpoint {
            Viewpoint::Input => correction.incorrect.as_str(),
            Viewpoint::Output => correction.correct.as_str(),
        };
        if needle.trim().is_empty() {
            continue;
        }

        for (start, end) in find_with_cascade(text, needle) {
            let start_char = char_offset(text, start);
            let end_char = char_offset(text, end);
            let duplicate = candidates.iter().any(|m| {
                m.correction_index != index
                    && m.start_char.abs_diff(start_char) <= MATCH_TOLERANCE
                    && m.end_char.abs_diff(end_char) <= MATCH_TOLERANCE
            });
            if !duplicate {
                candidates.push(MatchRange {
                    start,
                    end,
                    start_char,
                    end_char,
                    correction_index: index,
                });
            }
        }
    }

    // sort_by_key는 안정 정렬이므로 같은 시작 위치에서는 앞선 교정이 남습니다
    candidates.sort_by_key(|m| m.start);
    let mut accepted: Vec<MatchRange> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match accepted.last() {
            Some(last) if candidate.start < last.end => continue,
            _ => accepted.push(candidate),
        }
    }

    let highlight_type = match viewpoint {
        Viewpoint::Input => SegmentType::Incorrect,
        Viewpoint::Output => SegmentType::Correct,
    };

    let mut segments = Vec::with_capacity(accepted.len() * 2 + 1);
    let mut cursor = 0usize;
    let mut cursor_char = 0usize;
    for m in &accepted {
        if m.start > cursor {
            segments.push(normal_segment(&text[cursor..m.start], cursor_char, m.start_char));
        }
        segments.push(HighlightedSegment {
            text: text[m.start..m.end].to_string(),
            is_highlighted: true,
            kind: highlight_type,
            correction_index: Some(m.correction_index),
            position: Position {
                start: m.start_char,
                end: m.end_char,
            },
        });
        cursor = m.end;
        cursor_char = m.end_char;
    }
    if cursor < text.len() {
        let end_char = cursor_char + text[cursor..].chars().count();
        segments.push(normal_segment(&text[cursor..], cursor_char, end_char));
    }

    segments
}

fn normal_segment(text: &str, start: usize, end: usize) -> HighlightedSegment {
    HighlightedSegment {
        text: text.to_string(),
        is_highlighted: false,
        kind: SegmentType::Normal,
        correction_index: None,
        position: Position { start, end },
    }
}

/// 바이트 오프셋을 문자 오프셋으로 바꿉니다.
fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// 매칭 단계를 차례로 시도하고, 처음으로 결과가 나온 단계의 범위 목록을 돌려줍니다.
fn find_with_cascade(text: &str, needle: &str) -> Vec<(usize, usize)> {
    // 1단계: 정확한 일치
    let exact = find_all(text, needle);
    if !exact.is_empty() {
        return exact;
    }

    // 2단계: 앞뒤 공백 제거
    let trimmed = needle.trim();
    if trimmed != needle {
        let found = find_all(text, trimmed);
        if !found.is_empty() {
            return found;
        }
    }

    // 3단계: 유니코드 정규화 (예: U+0958 'क़' ↔ U+0915 U+093C)
    for normalized in [trimmed.nfc().collect::<String>(), trimmed.nfd().collect::<String>()] {
        if normalized != trimmed {
            let found = find_all(text, &normalized);
            if !found.is_empty() {
                return found;
            }
        }
    }

    // 4단계: 단어 사이 공백 개수/종류를 무시하는 정규식
    let pattern = trimmed
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    match Regex::new(&pattern) {
        Ok(re) => re.find_iter(text).map(|m| (m.start(), m.end())).collect(),
        Err(e) => {
            tracing::debug!("Highlight regex fallback failed for {:?}: {}", needle, e);
            Vec::new()
        }
    }
}

/// 겹치지 않는 모든 출현 위치 (바이트 범위)
fn find_all(text: &str, needle: &str) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }
    text.match_indices(needle)
        .map(|(start, matched)| (start, start + matched.len()))
        .collect()
}

/// 두 문자열을 공백 단위로 잘라 **같은 위치의 단어끼리** 비교합니다.
///
/// - 같은 인덱스에서 다른 단어 → 문법(grammar) 교정
/// - 교정문이 더 길면 남는 단어는 삽입 (`incorrect`가 빈 문자열)
/// - 원문이 더 길면 남는 단어는 삭제 (`correct`가 빈 문자열)
///
/// 최소 편집 거리 알고리즘이 아닙니다. 중간에 단어 하나가 끼어들면
/// 그 뒤의 모든 단어가 한 칸씩 밀려 변경으로 보고됩니다. 하이라이트 결과가
/// 이 동작에 의존하므로 그대로 둡니다.
///
/// 반환되는 교정에는 출처/단계 태그가 없습니다. 호출한 쪽에서 붙입니다.
pub fn word_diff(original: &str, corrected: &str) -> Vec<Correction> {
    let original_words: Vec<&str> = original.split_whitespace().collect();
    let corrected_words: Vec<&str> = corrected.split_whitespace().collect();
    let shared = original_words.len().min(corrected_words.len());

    let mut corrections = Vec::new();
    for (before, after) in original_words.iter().zip(&corrected_words) {
        if before != after {
            corrections.push(Correction::new(
                *before,
                *after,
                "शब्द में सुधार",
                CorrectionType::Grammar,
            ));
        }
    }

    for added in &corrected_words[shared..] {
        corrections.push(Correction::new("", *added, "शब्द जोड़ा गया", CorrectionType::Grammar));
    }
    for removed in &original_words[shared..] {
        corrections.push(Correction::new(*removed, "", "शब्द हटाया गया", CorrectionType::Grammar));
    }

    corrections
}
