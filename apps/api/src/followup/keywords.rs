//! Keyword extraction — pluggable, trait-based extractor that picks the resume
//! terms a follow-up question can hang off.
//!
//! Default: `TermFrequencyExtractor` (pure Rust, deterministic, no model).
//! Alternative: `LlmKeywordExtractor`, selected with `KEYWORD_EXTRACTOR=llm`.
//!
//! `AppState` holds an `Arc<dyn KeywordExtractor>`, chosen at startup.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::llm_client::prompts::{render, JSON_ONLY_SYSTEM};
use crate::llm_client::{LlmClient, ModelProfile};

pub const DEFAULT_TOP_N: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Up to `top_n` keywords, most significant first. Blank text yields none.
    async fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, AppError>;

    /// Backend name, logged alongside decisions.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// TermFrequencyExtractor — default implementation
// ────────────────────────────────────────────────────────────────────────────

/// Particles stripped from the end of Korean tokens (`프로젝트에서` -> `프로젝트`).
const PARTICLES: &[&str] = &[
    "에서는", "에서", "으로", "에게", "까지", "부터", "처럼", "보다", "와", "과", "을", "를", "이",
    "가", "은", "는", "의", "에", "로", "도", "만",
];

const STOP_WORDS: &[&str] = &[
    // Korean
    "그리고", "하지만", "그러나", "또한", "및", "등", "통해", "대한", "위해", "있는", "있습니다",
    "했습니다", "합니다", "하였습니다", "있었습니다", "것", "수", "저", "제가", "저는", "우리",
    "이런", "그런", "같은", "경우", "관련", "사용", "진행", "담당", "이름", "연락처", "이메일",
    // English
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "were", "have", "has",
    "into", "using", "used", "our", "your", "about", "com", "www", "http", "https",
];

/// Frequency-ranked keywords over Unicode word tokens.
///
/// 1. Split on anything that is not alphanumeric (Hangul counts as alphabetic).
/// 2. Strip trailing Korean particles; lowercase ASCII.
/// 3. Drop stop words, pure numbers and single-character tokens.
/// 4. Rank by count, ties broken by first appearance.
pub struct TermFrequencyExtractor;

impl TermFrequencyExtractor {
    pub fn rank(text: &str, top_n: usize) -> Vec<String> {
        // normalized form -> (count, first position, surface form)
        let mut counts: HashMap<String, (usize, usize, String)> = HashMap::new();

        let tokens = text
            .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
            .filter(|t| !t.is_empty());

        for (position, raw) in tokens.enumerate() {
            let surface = strip_particle(raw);
            let normalized = surface.to_lowercase();

            if normalized.chars().count() < 2
                || !normalized.chars().any(char::is_alphanumeric)
                || normalized.chars().all(|c| c.is_ascii_digit())
                || STOP_WORDS.contains(&normalized.as_str())
            {
                continue;
            }

            counts
                .entry(normalized)
                .and_modify(|entry| entry.0 += 1)
                .or_insert((1, position, surface.to_string()));
        }

        let mut ranked: Vec<(usize, usize, String)> = counts.into_values().collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.into_iter().take(top_n).map(|(_, _, s)| s).collect()
    }
}

fn strip_particle(token: &str) -> &str {
    if !token.chars().any(is_hangul) {
        return token;
    }
    for particle in PARTICLES {
        if let Some(stem) = token.strip_suffix(particle) {
            if stem.chars().count() >= 2 {
                return stem;
            }
        }
    }
    token
}

fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

#[async_trait]
impl KeywordExtractor for TermFrequencyExtractor {
    async fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, AppError> {
        Ok(Self::rank(text, top_n))
    }

    fn backend(&self) -> &'static str {
        "frequency"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmKeywordExtractor
// ────────────────────────────────────────────────────────────────────────────

const KEYWORD_PROMPT: &str = "\
다음 이력서에서 면접 꼬리질문의 근거가 될 핵심 키워드를 최대 {top_n}개 추출하세요.
기술 스택, 프로젝트명, 역할, 성과처럼 답변에서 다시 언급될 만한 명사만 고르세요.
이력서에 쓰인 표기 그대로 사용하세요.

Return a JSON array of strings, most important first.

[이력서]
{text}";

pub struct LlmKeywordExtractor {
    llm: LlmClient,
}

impl LlmKeywordExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl KeywordExtractor for LlmKeywordExtractor {
    async fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, AppError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let top_n_str = top_n.to_string();
        let prompt = render(KEYWORD_PROMPT, &[("top_n", &top_n_str), ("text", text)]);

        let keywords: Vec<String> = self
            .llm
            .call_json(ModelProfile::KeywordExtraction, &prompt, Some(JSON_ONLY_SYSTEM))
            .await
            .map_err(|e| AppError::Llm(e.to_string()))?;

        Ok(keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .take(top_n)
            .collect())
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_by_frequency_then_position() {
        let text = "Kafka 기반 파이프라인을 구축했습니다. Kafka와 Spark로 파이프라인 처리량을 개선했습니다. Spark";
        let keywords = TermFrequencyExtractor::rank(text, 3);
        assert_eq!(keywords, vec!["Kafka", "파이프라인", "Spark"]);
    }

    #[test]
    fn test_filters_stop_words_numbers_and_short_tokens() {
        let keywords = TermFrequencyExtractor::rank("the 2023 a 및 Rust", 10);
        assert_eq!(keywords, vec!["Rust"]);
    }

    #[test]
    fn test_keeps_symbol_languages() {
        let keywords = TermFrequencyExtractor::rank("C++ C# 개발", 10);
        assert!(keywords.contains(&"C++".to_string()));
        assert!(keywords.contains(&"C#".to_string()));
    }

    #[test]
    fn test_case_insensitive_grouping_keeps_first_surface() {
        let keywords = TermFrequencyExtractor::rank("Docker docker DOCKER", 10);
        assert_eq!(keywords, vec!["Docker"]);
    }

    #[tokio::test]
    async fn test_blank_text_yields_nothing() {
        let keywords = TermFrequencyExtractor.extract("   ", DEFAULT_TOP_N).await.unwrap();
        assert!(keywords.is_empty());
    }
}
