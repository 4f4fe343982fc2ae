/// LLM Client — the single point of entry for all Claude calls in the service.
///
/// No other module may call Bedrock directly. Each call site picks a
/// [`ModelProfile`], which pins the model id, token budget and temperature.
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, SdkError};
use aws_sdk_bedrockruntime::primitives::Blob;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const MAX_RETRIES: u32 = 3;

pub const HAIKU_3: &str = "anthropic.claude-3-haiku-20240307-v1:0";
pub const HAIKU_3_5: &str = "us.anthropic.claude-3-5-haiku-20241022-v1:0";
pub const SONNET_3_7: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";

/// Per-use-case model settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProfile {
    /// First pass of resume question generation.
    QuestionDraft,
    /// Second pass that filters and repairs the draft.
    QuestionReview,
    /// Interview feedback report; deterministic.
    Feedback,
    Followup,
    TranscriptRefine,
    KeywordExtraction,
}

impl ModelProfile {
    pub fn model_id(self) -> &'static str {
        match self {
            ModelProfile::QuestionDraft | ModelProfile::QuestionReview => HAIKU_3_5,
            ModelProfile::Feedback => SONNET_3_7,
            ModelProfile::Followup
            | ModelProfile::TranscriptRefine
            | ModelProfile::KeywordExtraction => HAIKU_3,
        }
    }

    pub fn max_tokens(self) -> u32 {
        match self {
            ModelProfile::Feedback => 2048,
            ModelProfile::TranscriptRefine => 1024,
            _ => 512,
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            ModelProfile::QuestionDraft | ModelProfile::Followup => 0.7,
            ModelProfile::QuestionReview | ModelProfile::TranscriptRefine => 0.3,
            ModelProfile::Feedback | ModelProfile::KeywordExtraction => 0.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Bedrock error: {0}")]
    Service(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Throttled after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct InvokeBody<'a> {
    anthropic_version: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

/// The single LLM client used by all services.
/// Wraps Bedrock `InvokeModel` (Anthropic messages format) with retry logic
/// and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: aws_sdk_bedrockruntime::Client,
}

impl LlmClient {
    pub fn new(client: aws_sdk_bedrockruntime::Client) -> Self {
        Self { client }
    }

    /// Makes a raw call, returning the full response object.
    /// Retries throttling, transient service faults and transport errors with
    /// exponential backoff.
    pub async fn call(
        &self,
        profile: ModelProfile,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        let body = serde_json::to_vec(&InvokeBody {
            anthropic_version: BEDROCK_ANTHROPIC_VERSION,
            max_tokens: profile.max_tokens(),
            temperature: profile.temperature(),
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        })?;

        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let result = self
                .client
                .invoke_model()
                .model_id(profile.model_id())
                .content_type("application/json")
                .accept("application/json")
                .body(Blob::new(body.clone()))
                .send()
                .await;

            let output = match result {
                Ok(output) => output,
                Err(err) => {
                    let message = DisplayErrorContext(&err).to_string();
                    let Some(kind) = failure_kind(&err) else {
                        return Err(LlmError::Service(message));
                    };
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(exhausted(kind, message));
                    }
                    warn!("Bedrock returned a retryable error: {message}");
                    continue;
                }
            };

            let response: LlmResponse = serde_json::from_slice(output.body().as_ref())?;

            if let Some(usage) = &response.usage {
                debug!(
                    "LLM call succeeded: model={}, input_tokens={}, output_tokens={}",
                    profile.model_id(),
                    usage.input_tokens,
                    usage.output_tokens
                );
            }

            return Ok(response);
        }
    }

    /// Calls the LLM and returns the trimmed text of the first text block.
    pub async fn call_text(
        &self,
        profile: ModelProfile,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, LlmError> {
        let response = self.call(profile, prompt, system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(text.trim().to_string())
    }

    /// Calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        profile: ModelProfile,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<T, LlmError> {
        let text = self.call_text(profile, prompt, system).await?;
        serde_json::from_str(strip_json_fences(&text)).map_err(LlmError::Parse)
    }
}

/// A failure worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Throttled,
    Transient,
}

fn failure_kind<R>(
    err: &SdkError<aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError, R>,
) -> Option<FailureKind> {
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => Some(FailureKind::Transient),
        SdkError::ServiceError(service) => {
            let e = service.err();
            if e.is_throttling_exception() {
                Some(FailureKind::Throttled)
            } else if e.is_internal_server_exception()
                || e.is_model_not_ready_exception()
                || e.is_model_timeout_exception()
            {
                Some(FailureKind::Transient)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// The error reported once every attempt has failed.
fn exhausted(kind: FailureKind, message: String) -> LlmError {
    match kind {
        FailureKind::Throttled => LlmError::RateLimited {
            retries: MAX_RETRIES,
        },
        FailureKind::Transient => LlmError::Service(message),
    }
}

/// Splits model output into non-empty trimmed lines.
pub fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_throttling_reports_rate_limit() {
        let err = exhausted(FailureKind::Throttled, "ThrottlingException".to_string());
        assert!(matches!(err, LlmError::RateLimited { retries: MAX_RETRIES }));
    }

    #[test]
    fn test_exhausted_transient_keeps_service_message() {
        let err = exhausted(FailureKind::Transient, "dispatch failure".to_string());
        assert!(matches!(err, LlmError::Service(m) if m == "dispatch failure"));
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n[\"rust\", \"aws\"]\n```";
        assert_eq!(strip_json_fences(input), "[\"rust\", \"aws\"]");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_invoke_body_shape() {
        let body = serde_json::to_value(InvokeBody {
            anthropic_version: BEDROCK_ANTHROPIC_VERSION,
            max_tokens: 512,
            temperature: 0.7,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
        })
        .unwrap();
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let raw = r#"{"content":[{"type":"text","text":"질문입니다"}],"usage":{"input_tokens":3,"output_tokens":5}}"#;
        let response: LlmResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), Some("질문입니다"));
    }

    #[test]
    fn test_response_without_content_has_no_text() {
        let response: LlmResponse = serde_json::from_str(r#"{"usage":null}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_profiles_pin_sampling() {
        assert_eq!(ModelProfile::Feedback.temperature(), 0.0);
        assert_eq!(ModelProfile::Feedback.max_tokens(), 2048);
        assert_eq!(ModelProfile::QuestionReview.temperature(), 0.3);
        assert_eq!(ModelProfile::QuestionDraft.model_id(), HAIKU_3_5);
    }

    #[test]
    fn test_non_empty_lines() {
        let lines = non_empty_lines("  첫 질문?\n\n두 번째 질문?  \n   \n");
        assert_eq!(lines, vec!["첫 질문?", "두 번째 질문?"]);
    }
}
