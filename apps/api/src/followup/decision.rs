use crate::llm_client::prompts::render;

/// Minimum number of resume keywords an answer must mention.
pub const DEFAULT_THRESHOLD: usize = 1;

/// Keywords mentioned in the answer, compared case-insensitively, in keyword order.
pub fn matched_keywords(answer: &str, keywords: &[String]) -> Vec<String> {
    let answer = answer.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty() && answer.contains(&k.to_lowercase()))
        .cloned()
        .collect()
}

pub fn should_generate_followup(answer: &str, keywords: &[String], threshold: usize) -> bool {
    matched_keywords(answer, keywords).len() >= threshold
}

const FOLLOWUP_TEMPLATE: &str = "\
사용자가 자기소개서에서 다음과 같은 키워드를 강조했습니다: {keywords}.
이에 대해 다음과 같은 답변을 했습니다: \"{answer}\".
특히 다음 키워드가 매칭되었습니다: {matched}.
이 키워드를 바탕으로 follow-up 질문 1개만 자연스럽게 생성해주세요.
질문은 면접관이 묻는 말투로 해주세요.
질문 문장만 출력하세요.";

pub fn followup_prompt(keywords: &[String], answer: &str, matched: &[String]) -> String {
    render(
        FOLLOWUP_TEMPLATE,
        &[
            ("keywords", &keywords.join(", ")),
            ("answer", answer),
            ("matched", &matched.join(", ")),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let keywords = kw(&["Kubernetes", "Redis", "결제"]);
        let matched = matched_keywords("kubernetes 위에 결제 시스템을 올렸습니다", &keywords);
        assert_eq!(matched, kw(&["Kubernetes", "결제"]));
    }

    #[test]
    fn test_threshold() {
        let keywords = kw(&["Rust", "gRPC"]);
        assert!(should_generate_followup("Rust로 작성했습니다", &keywords, DEFAULT_THRESHOLD));
        assert!(!should_generate_followup("Rust로 작성했습니다", &keywords, 2));
        assert!(!should_generate_followup("잘 모르겠습니다", &keywords, DEFAULT_THRESHOLD));
    }

    #[test]
    fn test_no_keywords_never_triggers() {
        assert!(!should_generate_followup("아무 답변", &[], DEFAULT_THRESHOLD));
    }

    #[test]
    fn test_prompt_lists_keywords() {
        let prompt = followup_prompt(&kw(&["Rust", "AWS"]), "답변", &kw(&["Rust"]));
        assert!(prompt.contains("키워드를 강조했습니다: Rust, AWS."));
        assert!(prompt.contains("매칭되었습니다: Rust."));
        assert!(prompt.contains("\"답변\""));
    }
}
