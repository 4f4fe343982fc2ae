use tracing::{info, warn};

use crate::llm_client::prompts::render;
use crate::llm_client::{LlmClient, ModelProfile};

const REFINE_TEMPLATE: &str = "\
다음은 한국어 음성 인식 결과입니다. 문법 오류, 문장 부호 누락을 보정하되, 숫자와 영어 약어는 발음을 분석해 정확한 원래 표기로 복원해 주세요.

예를 들어:
- \"십오분\" → \"15분\"
- \"이씨투\" → \"EC2\"
- \"에이더블유에스\" → \"AWS\"
- \"삼 점 일 사\" → \"3.14\"
- \"디 비 에스\" → \"DBS\"

단, 발음이 숫자나 영어를 뜻하는 경우에만 변환하세요.
그리고 이름, 지명, 고유명사는 가능한 한 그대로 유지하세요. 의미가 명확하지 않으면 원문을 보존하세요.

[전사 시작]
{transcript}
[전사 끝]
";

pub fn refine_prompt(transcript: &str) -> String {
    render(REFINE_TEMPLATE, &[("transcript", transcript)])
}

/// Restores numbers and English acronyms in a raw transcript.
/// Blank input is returned as is; on LLM failure the raw text is kept.
pub async fn refine_transcript(llm: &LlmClient, transcript: &str) -> String {
    if transcript.trim().is_empty() {
        info!("Empty transcript; skipping refinement");
        return transcript.to_string();
    }

    match llm
        .call_text(ModelProfile::TranscriptRefine, &refine_prompt(transcript), None)
        .await
    {
        Ok(refined) => refined,
        Err(e) => {
            warn!("Transcript refinement failed, keeping raw text: {e}");
            transcript.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refine_prompt_wraps_transcript() {
        let prompt = refine_prompt("에이더블유에스를 썼습니다");
        assert!(prompt.contains("[전사 시작]\n에이더블유에스를 썼습니다\n[전사 끝]"));
        assert!(prompt.contains("\"이씨투\" → \"EC2\""));
    }
}
