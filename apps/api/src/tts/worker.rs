//! Background consumer for the synthesis queue.
//!
//! Each job carries the bearer token of the user who asked for it; the token
//! is verified again here so the audio lands under the right user's prefix.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::queue::{ReceivedJob, TtsJob};
use crate::state::AppState;
use crate::tts::{synthesize_followup, synthesize_resume_questions};

const WAIT_SECONDS: i32 = 20;
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// What a job asks for once its body is decoded.
#[derive(Debug, PartialEq, Eq)]
pub enum JobKind {
    Followup { question_number: String, text: String },
    ResumeQuestions,
}

impl JobKind {
    pub fn of(job: &TtsJob) -> Self {
        let number = job.question_number.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let text = job.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
        match (number, text) {
            (Some(question_number), Some(text)) => JobKind::Followup {
                question_number: question_number.to_string(),
                text: text.to_string(),
            },
            _ => JobKind::ResumeQuestions,
        }
    }
}

/// Why a job was not completed.
#[derive(Debug)]
enum JobFailure {
    /// Will never succeed; drop it from the queue.
    Poison(String),
    /// Leave it for redelivery after the visibility timeout.
    Retry(AppError),
}

pub fn spawn_worker(state: AppState) -> JoinHandle<()> {
    tokio::spawn(run(state))
}

pub async fn run(state: AppState) {
    info!("TTS worker started");
    loop {
        let jobs = match state.queue.receive(1, WAIT_SECONDS).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("TTS queue receive failed: {e}");
                tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                continue;
            }
        };

        for job in jobs {
            handle_job(&state, job).await;
        }
    }
}

async fn handle_job(state: &AppState, job: ReceivedJob) {
    match process(state, &job.body).await {
        Ok(()) => acknowledge(state, &job.receipt_handle).await,
        Err(JobFailure::Poison(reason)) => {
            error!("Dropping TTS job: {reason}");
            acknowledge(state, &job.receipt_handle).await;
        }
        Err(JobFailure::Retry(e)) => {
            error!("TTS job failed, leaving it for redelivery: {e}");
        }
    }
}

async fn acknowledge(state: &AppState, receipt_handle: &str) {
    if let Err(e) = state.queue.acknowledge(receipt_handle).await {
        warn!("Could not delete TTS job: {e}");
    }
}

async fn process(state: &AppState, body: &str) -> Result<(), JobFailure> {
    let job: TtsJob = serde_json::from_str(body)
        .map_err(|e| JobFailure::Poison(format!("unreadable body: {e}")))?;
    let user = authenticate(state, &job).await?;
    let prefix = user.email_prefix();

    match JobKind::of(&job) {
        JobKind::Followup { question_number, text } => {
            let url = synthesize_followup(state, prefix, &question_number, &text)
                .await
                .map_err(JobFailure::Retry)?;
            info!("Follow-up {question_number} voiced for {prefix}: {url}");
        }
        JobKind::ResumeQuestions => {
            let results = synthesize_resume_questions(state, prefix)
                .await
                .map_err(|e| match e {
                    AppError::NotFound(msg) => JobFailure::Poison(msg),
                    other => JobFailure::Retry(other),
                })?;
            info!("Voiced {} resume questions for {prefix}", results.len());
        }
    }
    Ok(())
}

async fn authenticate(state: &AppState, job: &TtsJob) -> Result<AuthUser, JobFailure> {
    let token = job
        .token()
        .ok_or_else(|| JobFailure::Poison("missing bearer token".to_string()))?;
    state.verifier.verify(token).await.map_err(|e| match e {
        AppError::Unauthorized(msg) => JobFailure::Poison(format!("token rejected: {msg}")),
        other => JobFailure::Retry(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_with_number_and_text_is_followup() {
        let job = TtsJob::followup("tok", "2-1", "어떤 점이 가장 어려웠나요?");
        assert_eq!(
            JobKind::of(&job),
            JobKind::Followup {
                question_number: "2-1".to_string(),
                text: "어떤 점이 가장 어려웠나요?".to_string(),
            }
        );
    }

    #[test]
    fn test_headers_only_job_voices_resume_questions() {
        assert_eq!(JobKind::of(&TtsJob::resume_questions("tok")), JobKind::ResumeQuestions);
    }

    #[test]
    fn test_blank_text_falls_back_to_resume_questions() {
        let job = TtsJob::followup("tok", "3", "   ");
        assert_eq!(JobKind::of(&job), JobKind::ResumeQuestions);
    }
}
