//! Two-pass resume question generation: draft, then review against the resume.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{render, QUESTION_OUTPUT_RULES};
use crate::llm_client::{non_empty_lines, LlmClient, ModelProfile};
use crate::questions::prompts::{CLOSING_QUESTION, DRAFT_TEMPLATE, INTRO_QUESTION, REVIEW_TEMPLATE};

/// Number of resume-grounded questions between the fixed intro and closing.
pub const GENERATED_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "쉬움" => Some(Difficulty::Easy),
            "중간" => Some(Difficulty::Medium),
            "어려움" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "쉬움",
            Difficulty::Medium => "중간",
            Difficulty::Hard => "어려움",
        }
    }

    pub fn guidance(self) -> &'static str {
        match self {
            Difficulty::Easy => "부담 없이 답할 수 있는 질문을 만들어주세요. 이력서에 나와있는 내용 중심과 간단한 경험 중심으로 해주세요.",
            Difficulty::Medium => "기술, 프로젝트, 협업 상황에 대해 본인이 설명할 수 있는 수준의 구체적인 질문을 만들어주세요.",
            Difficulty::Hard => "한 가지 주제에 깊이 있게 질문해주세요. 특히 사용한 기술이 있다면 기술에 대해 전문적인 지식을 요구하는 질문을 만들어주세요. 예: 기술 선택 이유, 문제 해결 전략, 아키텍처 설계 판단 등. 한 문장에 여러 질문을 넣지 마세요. 사고력을 요하는 질문이어야 합니다.",
        }
    }
}

pub fn draft_prompt(resume_text: &str, difficulty: Difficulty) -> String {
    render(
        DRAFT_TEMPLATE,
        &[
            ("resume", resume_text),
            ("difficulty", difficulty.label()),
            ("guidance", difficulty.guidance()),
            ("output_rules", QUESTION_OUTPUT_RULES),
        ],
    )
}

pub fn review_prompt(resume_text: &str, draft: &[String], difficulty: Difficulty) -> String {
    let draft = draft.join("\n");
    render(
        REVIEW_TEMPLATE,
        &[
            ("resume", resume_text),
            ("draft", &draft),
            ("guidance", difficulty.guidance()),
            ("output_rules", QUESTION_OUTPUT_RULES),
        ],
    )
}

/// Intro, up to three generated questions, closing.
pub fn interview_script(generated: &[String]) -> Vec<String> {
    std::iter::once(INTRO_QUESTION.to_string())
        .chain(generated.iter().take(GENERATED_COUNT).cloned())
        .chain(std::iter::once(CLOSING_QUESTION.to_string()))
        .collect()
}

/// Runs both passes and returns the full five-question script.
pub async fn generate_interview_questions(
    llm: &LlmClient,
    resume_text: &str,
    difficulty: Difficulty,
) -> Result<Vec<String>, AppError> {
    let draft_text = llm
        .call_text(ModelProfile::QuestionDraft, &draft_prompt(resume_text, difficulty), None)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;
    let draft = non_empty_lines(&draft_text);
    info!("Drafted {} questions ({})", draft.len(), difficulty.label());

    let reviewed_text = llm
        .call_text(
            ModelProfile::QuestionReview,
            &review_prompt(resume_text, &draft, difficulty),
            None,
        )
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;
    let reviewed = non_empty_lines(&reviewed_text);

    let chosen = if reviewed.len() >= GENERATED_COUNT || draft.len() < GENERATED_COUNT {
        reviewed
    } else {
        warn!(
            "Review pass returned {} questions; keeping the draft",
            reviewed.len()
        );
        draft
    };

    Ok(interview_script(&chosen))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_from_korean_label() {
        assert_eq!(Difficulty::from_label("어려움"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::default(), Difficulty::Medium);
        assert_eq!(Difficulty::from_label(" 쉬움 "), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_label("easy"), None);
    }

    #[test]
    fn test_script_wraps_three_questions() {
        let generated: Vec<String> = (1..=5).map(|i| format!("질문 {i}?")).collect();
        let script = interview_script(&generated);
        assert_eq!(script.len(), 5);
        assert_eq!(script[0], INTRO_QUESTION);
        assert_eq!(script[1], "질문 1?");
        assert_eq!(script[3], "질문 3?");
        assert_eq!(script[4], CLOSING_QUESTION);
    }

    #[test]
    fn test_resume_braces_are_not_expanded() {
        let draft = draft_prompt("경력: {output_rules} {guidance}", Difficulty::Hard);
        assert!(draft.contains("경력: {output_rules} {guidance}"));
        assert_eq!(draft.matches(QUESTION_OUTPUT_RULES).count(), 1);
    }

    #[test]
    fn test_prompts_embed_resume_and_guidance() {
        let draft = draft_prompt("Rust 백엔드 3년", Difficulty::Easy);
        assert!(draft.contains("Rust 백엔드 3년"));
        assert!(draft.contains("(난이도: 쉬움)"));
        assert!(draft.contains(Difficulty::Easy.guidance()));
        assert!(!draft.contains("{output_rules}"));

        let review = review_prompt("이력서", &["A?".into(), "B?".into()], Difficulty::Hard);
        assert!(review.contains("A?\nB?"));
        assert!(review.contains(Difficulty::Hard.guidance()));
    }
}
