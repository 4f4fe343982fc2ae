use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::questions::numbering::number_from_value;
use crate::state::AppState;
use crate::tts::{synthesize_followup, synthesize_resume_questions, GeneratedAudio};

#[derive(Deserialize)]
pub struct FollowupTtsRequest {
    pub text: Option<String>,
    /// `3`, `"3"` or `"2-1"`.
    pub question_number: Option<Value>,
}

#[derive(Serialize)]
pub struct FollowupTtsResponse {
    pub message: &'static str,
    pub file_url: String,
}

/// POST /api/generate-followup-question/tts/
pub async fn handle_followup_tts(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<FollowupTtsRequest>,
) -> Result<Json<FollowupTtsResponse>, AppError> {
    let text = req
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("text field is required".to_string()))?;
    let number = number_from_value(req.question_number)
        .ok_or_else(|| AppError::Validation("question_number field is required".to_string()))?;

    let file_url = synthesize_followup(&state, user.email_prefix(), &number, &text).await?;
    Ok(Json(FollowupTtsResponse {
        message: "TTS 생성 및 S3 업로드 성공",
        file_url,
    }))
}

#[derive(Serialize)]
pub struct ResumeTtsResponse {
    pub message: &'static str,
    pub results: Vec<GeneratedAudio>,
}

/// POST /api/generate-resume-question/
pub async fn handle_resume_question_tts(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ResumeTtsResponse>, AppError> {
    let results = synthesize_resume_questions(&state, user.email_prefix()).await?;
    Ok(Json(ResumeTtsResponse {
        message: "TTS 생성 및 S3 업로드 성공 (순차 처리)",
        results,
    }))
}
