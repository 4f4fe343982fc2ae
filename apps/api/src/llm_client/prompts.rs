// Shared prompt fragments. Each module that calls the LLM keeps its own
// prompts.rs next to it; only cross-cutting pieces live here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Output rules shared by every prompt that must return bare question lines.
pub const QUESTION_OUTPUT_RULES: &str = "\
[출력 형식 규칙] — 위반 시 실패
- 질문 앞에 **숫자, Q1, - , : ,등의 접두어는 절대로 붙이지 마세요.**
- **KOREAN ELECTRONICS** 같은 번역된 표현은 사용하지 마세요. 반드시 이력서에 있는 **원어 그대로 사용**하세요.
- 모든 질문은 **대문자로 시작**하고, **완전한 자연어 문장**이어야 합니다.
- '귀하'라는 표현 대신 **항상 '본인'**을 사용하세요. 이름이 있다면 이름을 써도 됩니다.
- 출력은 반드시 줄바꿈으로 구분된 질문 3개만 포함해야 하며, 다른 말은 절대로 출력하지 마세요.";

/// Fills `{name}` placeholders in a template in one left-to-right pass.
/// Inserted values are never scanned again, so placeholder text inside a
/// value stays literal.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(var, _)| *var == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let out = render("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and y and x");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{missing}", &[("a", "x")]), "{missing}");
    }

    #[test]
    fn test_render_keeps_placeholders_inside_values_literal() {
        let out = render(
            "Resume: {resume}\nRules: {output_rules}",
            &[("resume", "I love {output_rules}"), ("output_rules", "ONE PER LINE")],
        );
        assert_eq!(out, "Resume: I love {output_rules}\nRules: ONE PER LINE");
    }

    #[test]
    fn test_render_passes_stray_braces_through() {
        let out = render("{\"score\": {n}} {", &[("n", "3")]);
        assert_eq!(out, "{\"score\": 3} {");
    }
}
