use crate::llm_client::prompts::render;

pub const FEEDBACK_TEMPLATE: &str = "\
당신은 AI 면접 코치입니다. 아래는 면접자의 분석 데이터입니다:

[전체 답변 결과]
{transcript}

[음성 분석 결과]
{voice}

[자세 분석 결과]
{posture}

위 데이터를 바탕으로 면접자의 답변을 다음 기준에 따라 피드백을 작성해주세요. 반드시 아래 형식을 따라 작성해주세요:

=== 요약 ===
[면접자 평가에 대한 전체적인 요약 1-2문장]

=== 일관성 ===
- [전체 답변 결과를 바탕으로 답변 전체에 흐름이 있고 앞뒤가 자연스럽게 연결되는지에 대한 피드백]
(점수: 0~5점 중 하나)

=== 논리성 ===
- [전체 답변 결과를 바탕으로 주장에 대해 명확한 이유와 근거가 있으며 논리적 흐름이 있는지에 대한 피드백]
(점수: 0~5점 중 하나)

=== 대처능력 ===
- [전체 답변 결과를 바탕으로 예상치 못한 질문에도 당황하지 않고 유연하게 답했는지에 대한 피드백]
(점수: 0~5점 중 하나)

=== 구체성 ===
- [전체 답변 결과를 바탕으로 추상적인 설명보다 구체적인 경험과 예시가 포함되어 있는지에 대한 피드백]
(점수: 0~5점 중 하나)

=== 말하기방식 ===
- [음성 분석 결과를 바탕으로 목소리 떨림 여부와 말 속도(단어/초)에 대한 코멘트]
- [음성 분석 결과를 바탕으로 침묵 비율(%)과 감정 상태에 대한 코멘트]
(점수: 0~5점 중 하나)

=== 면접태도 ===
- [자세 분석 결과를 바탕으로 자세 흔들림 횟수와 그 빈도에 대한 해석을 포함한 코멘트]
(점수: 0~5점 중 하나)
";

/// Voice metrics as the bullet list the report prompt expects.
pub fn voice_description(
    voice_tremor: &str,
    pitch_std: f64,
    speech_rate: f64,
    silence_ratio: f64,
    emotion: &str,
) -> String {
    format!(
        "- 목소리 떨림: {voice_tremor}\n\
         - Pitch 표준편차: {pitch_std}\n\
         - 말 속도: {speech_rate} 단어/초\n\
         - 침묵 비율: {:.1}%\n\
         - 감정 상태: {emotion}",
        silence_ratio * 100.0
    )
}

pub fn posture_description(total_events: u64) -> String {
    format!("면접 중 총 {total_events}회의 자세 흔들림이 감지되었습니다.")
}

pub fn feedback_prompt(transcript: &str, voice: &str, posture: &str) -> String {
    render(
        FEEDBACK_TEMPLATE,
        &[("transcript", transcript), ("voice", voice), ("posture", posture)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_description_formats_silence_percent() {
        let desc = voice_description("안정적", 12.34, 1.5, 0.256, "침착함");
        assert!(desc.contains("- 침묵 비율: 25.6%"));
        assert!(desc.contains("- Pitch 표준편차: 12.34"));
        assert!(desc.contains("- 말 속도: 1.5 단어/초"));
    }

    #[test]
    fn test_prompt_embeds_all_inputs() {
        let prompt = feedback_prompt("답변 내용", "- 목소리 떨림: 감지됨", &posture_description(3));
        assert!(prompt.contains("답변 내용"));
        assert!(prompt.contains("- 목소리 떨림: 감지됨"));
        assert!(prompt.contains("총 3회의 자세 흔들림"));
        assert!(!prompt.contains("{transcript}"));
        for (name, _) in crate::feedback::report::CRITERIA {
            assert!(prompt.contains(&format!("=== {name} ===")));
        }
    }
}
