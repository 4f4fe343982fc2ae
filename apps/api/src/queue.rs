//! FIFO queue of speech-synthesis jobs.
//!
//! A job without `question_number`/`text` asks the worker to voice the
//! generated resume questions; a job with both voices one follow-up question.
//! The caller's bearer token travels with the job so the worker can act on
//! the user's behalf.

use aws_sdk_sqs::error::DisplayErrorContext;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::AppError;

const MESSAGE_GROUP: &str = "global";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHeaders {
    #[serde(rename = "Authorization")]
    pub authorization: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub headers: JobHeaders,
}

impl TtsJob {
    pub fn resume_questions(token: &str) -> Self {
        Self {
            question_number: None,
            text: None,
            headers: JobHeaders {
                authorization: format!("Bearer {token}"),
            },
        }
    }

    pub fn followup(token: &str, question_number: &str, text: &str) -> Self {
        Self {
            question_number: Some(question_number.to_string()),
            text: Some(text.to_string()),
            headers: JobHeaders {
                authorization: format!("Bearer {token}"),
            },
        }
    }

    pub fn token(&self) -> Option<&str> {
        crate::auth::jwt::bearer_token(&self.headers.authorization)
    }
}

/// A job pulled off the queue, with the handle needed to acknowledge it.
#[derive(Debug)]
pub struct ReceivedJob {
    pub receipt_handle: String,
    pub body: String,
}

#[derive(Clone)]
pub struct QuestionQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl QuestionQueue {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Sends a job and returns the queue's message id.
    pub async fn enqueue(&self, job: &TtsJob, dedup_id: &str) -> Result<String, AppError> {
        let body = serde_json::to_string(job)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("serializing TTS job: {e}")))?;

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .message_group_id(MESSAGE_GROUP)
            .message_deduplication_id(dedup_id)
            .send()
            .await
            .map_err(|e| AppError::Queue(format!("send_message failed: {}", DisplayErrorContext(&e))))?;

        let message_id = output.message_id().unwrap_or_default().to_string();
        info!("Enqueued TTS job {message_id} (dedup {dedup_id})");
        Ok(message_id)
    }

    /// Long-polls for up to `max` jobs.
    pub async fn receive(&self, max: i32, wait_seconds: i32) -> Result<Vec<ReceivedJob>, AppError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max)
            .wait_time_seconds(wait_seconds)
            .send()
            .await
            .map_err(|e| {
                AppError::Queue(format!("receive_message failed: {}", DisplayErrorContext(&e)))
            })?;

        let jobs: Vec<ReceivedJob> = output
            .messages()
            .iter()
            .filter_map(|m| {
                Some(ReceivedJob {
                    receipt_handle: m.receipt_handle()?.to_string(),
                    body: m.body()?.to_string(),
                })
            })
            .collect();

        debug!("Received {} TTS jobs", jobs.len());
        Ok(jobs)
    }

    pub async fn acknowledge(&self, receipt_handle: &str) -> Result<(), AppError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| {
                AppError::Queue(format!("delete_message failed: {}", DisplayErrorContext(&e)))
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resume_job_carries_only_headers() {
        let value = serde_json::to_value(TtsJob::resume_questions("tok")).unwrap();
        assert_eq!(value, json!({"headers": {"Authorization": "Bearer tok"}}));
    }

    #[test]
    fn test_followup_job_shape() {
        let value = serde_json::to_value(TtsJob::followup("tok", "2-1", "왜 Rust를 선택했나요?")).unwrap();
        assert_eq!(value["question_number"], "2-1");
        assert_eq!(value["text"], "왜 Rust를 선택했나요?");
        assert_eq!(value["headers"]["Authorization"], "Bearer tok");
    }

    #[test]
    fn test_job_token_parses_from_body() {
        let job: TtsJob =
            serde_json::from_str(r#"{"headers":{"Authorization":"Bearer abc.def"}}"#).unwrap();
        assert_eq!(job.token(), Some("abc.def"));
        assert!(job.question_number.is_none());
    }
}
