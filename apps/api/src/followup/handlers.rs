use std::time::Duration;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::followup::decision::{
    followup_prompt, matched_keywords, should_generate_followup, DEFAULT_THRESHOLD,
};
use crate::followup::keywords::DEFAULT_TOP_N;
use crate::llm_client::ModelProfile;
use crate::queue::TtsJob;
use crate::questions::numbering::{next_followup_number, number_from_value};
use crate::state::AppState;
use crate::storage::keys;

const AUDIO_POLL_ATTEMPTS: u32 = 10;
const AUDIO_POLL_INTERVAL: Duration = Duration::from_secs(1);
const AUDIO_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Deserialize)]
pub struct FollowupRequest {
    pub resume_text: Option<String>,
    pub user_answer: Option<String>,
    /// Sent as a number or a string by different clients.
    pub base_question_number: Option<serde_json::Value>,
    #[serde(default)]
    pub existing_question_numbers: Vec<String>,
    pub interview_id: Option<String>,
}

#[derive(Serialize)]
pub struct FollowupResponse {
    pub followup_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<Option<String>>,
    pub matched_keywords: Vec<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /api/followup/check/
pub async fn handle_followup_check(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<FollowupRequest>,
) -> Result<Json<FollowupResponse>, AppError> {
    let missing =
        || AppError::Validation("resume_text, user_answer, base_question_number, interview_id는 필수입니다.".to_string());
    let resume_text = required(req.resume_text).ok_or_else(missing)?;
    let answer = required(req.user_answer).ok_or_else(missing)?;
    let base = number_from_value(req.base_question_number).ok_or_else(missing)?;
    let interview_id = required(req.interview_id).ok_or_else(missing)?;

    let keywords = state.keywords.extract(&resume_text, DEFAULT_TOP_N).await?;
    let matched = matched_keywords(&answer, &keywords);
    debug!(
        "Follow-up check for {interview_id}: backend={}, keywords={keywords:?}, matched={matched:?}",
        state.keywords.backend()
    );

    if !should_generate_followup(&answer, &keywords, DEFAULT_THRESHOLD) {
        return Ok(Json(FollowupResponse {
            followup_generated: false,
            question: None,
            question_number: None,
            audio_url: None,
            matched_keywords: matched,
        }));
    }

    let question = state
        .llm
        .call_text(
            ModelProfile::Followup,
            &followup_prompt(&keywords, &answer, &matched),
            None,
        )
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let number = next_followup_number(&base, &req.existing_question_numbers);
    let prefix = user.email_prefix();
    info!("Generated follow-up {number} for {prefix}");

    state
        .storage
        .put(
            &state.config.followup_bucket,
            &keys::followup_text_key(prefix, &number),
            question.clone(),
            "text/plain; charset=utf-8",
        )
        .await?;

    let job = TtsJob::followup(&user.token, &number, &question);
    state
        .queue
        .enqueue(&job, &format!("{prefix}-{number}"))
        .await?;

    let audio_key = keys::tts_audio_key(prefix, &number);
    let tts_bucket = &state.config.tts_bucket;
    let ready = state
        .storage
        .wait_for_object(tts_bucket, &audio_key, AUDIO_POLL_ATTEMPTS, AUDIO_POLL_INTERVAL)
        .await?;

    let audio_url = if ready {
        Some(state.storage.presigned_get(tts_bucket, &audio_key, AUDIO_URL_TTL).await?)
    } else {
        warn!("Audio for follow-up {number} not ready after {AUDIO_POLL_ATTEMPTS} polls");
        None
    };

    Ok(Json(FollowupResponse {
        followup_generated: true,
        question: Some(question),
        question_number: Some(number),
        audio_url: Some(audio_url),
        matched_keywords: matched,
    }))
}
