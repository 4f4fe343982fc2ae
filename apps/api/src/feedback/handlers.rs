use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::feedback::archive::{build_zip, is_archive_member};
use crate::feedback::cache::CachedScore;
use crate::feedback::history::{FeedbackRecord, SortField};
use crate::feedback::prompts::{feedback_prompt, posture_description, voice_description};
use crate::feedback::report::{
    calculate_score, interviewer_emoji, parse_plain_feedback, validate_feedback_format,
};
use crate::llm_client::ModelProfile;
use crate::multipart::MultipartForm;
use crate::state::AppState;
use crate::storage::keys;
use crate::voice::merge_session_transcripts;

#[derive(Deserialize)]
pub struct FeedbackAnalysis {
    #[serde(default)]
    pub transcribe_text: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
    /// Per-segment counts keyed by segment, or a single total.
    #[serde(default)]
    pub posture_count: Value,
    pub voice_tremor: String,
    pub pitch_std: f64,
    pub speech_rate: f64,
    pub silence_ratio: f64,
    pub emotion: String,
}

#[derive(Deserialize)]
pub struct GenerateFeedbackRequest {
    pub analysis: FeedbackAnalysis,
}

/// Total posture events: the sum of a per-segment map, or a bare count.
pub fn posture_total(value: &Value) -> u64 {
    match value {
        Value::Object(map) => map.values().filter_map(Value::as_u64).sum(),
        Value::Number(n) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

/// POST /api/interview/feedback/generate/
pub async fn handle_generate_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<GenerateFeedbackRequest>,
) -> Result<Json<Value>, AppError> {
    let analysis = req.analysis;

    let transcript = match analysis.transcribe_text.filter(|t| !t.trim().is_empty()) {
        Some(text) => text,
        None => {
            let upload_id = analysis
                .upload_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Validation("transcribe_text 또는 upload_id가 필요합니다.".to_string())
                })?;
            merge_session_transcripts(&state, user.email_prefix(), upload_id).await?
        }
    };

    let voice = voice_description(
        &analysis.voice_tremor,
        analysis.pitch_std,
        analysis.speech_rate,
        analysis.silence_ratio,
        &analysis.emotion,
    );
    let posture = posture_description(posture_total(&analysis.posture_count));
    let prompt = feedback_prompt(&transcript, &voice, &posture);

    let raw = state
        .llm
        .call_text(ModelProfile::Feedback, &prompt, None)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let missing = validate_feedback_format(&raw);
    if missing.is_empty() {
        info!("Feedback report for {} has every section", user.email);
    } else {
        error!("Feedback report is missing sections: {missing:?}");
    }

    let report = parse_plain_feedback(&raw);
    let score = calculate_score(&report.chart());
    let emoji = interviewer_emoji(score);

    state
        .score_cache
        .store(&CachedScore {
            user_email: user.email.clone(),
            score,
            emoji: emoji.to_string(),
        })
        .await?;
    info!("Feedback score {score} {emoji} for {}", user.email);

    Ok(Json(report.to_json()))
}

#[derive(Serialize)]
pub struct PdfUploadResponse {
    pub pdf_url: String,
}

/// POST /api/upload/pdf/
pub async fn handle_upload_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<PdfUploadResponse>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let missing = || AppError::Validation("file, videoId 필수".to_string());
    let pdf = form.take_file("pdf").ok_or_else(missing)?;
    let video_id = form.field("video_id").ok_or_else(missing)?.to_string();

    let cached = state.score_cache.load(&user.email).await?.ok_or_else(|| {
        AppError::Validation("피드백 분석 정보가 만료되었거나 없습니다.".to_string())
    })?;

    let bucket = &state.config.clip_bucket;
    let key = keys::report_pdf_key(user.email_prefix(), &video_id);
    state.storage.put(bucket, &key, pdf.data, "application/pdf").await?;
    let pdf_url = state.storage.public_url(bucket, &key);

    state
        .history
        .save(FeedbackRecord::new(
            &user.email,
            &video_id,
            cached.score,
            &cached.emoji,
            &pdf_url,
            Utc::now(),
        ))
        .await?;

    Ok(Json(PdfUploadResponse { pdf_url }))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// GET /api/feedback/history/
pub async fn handle_feedback_history(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let sort = SortField::parse(query.sort.as_deref());
    let ascending = query.order.as_deref() == Some("asc");
    let items = state.history.list(&user.email, sort, ascending).await?;
    Ok(Json(items))
}

#[derive(Deserialize)]
pub struct SignedUrlQuery {
    pub video_id: Option<String>,
}

#[derive(Serialize)]
pub struct SignedUrlResponse {
    pub signed_url: String,
}

/// GET /api/get-signed-url/
pub async fn handle_signed_url(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SignedUrlQuery>,
) -> Result<Json<SignedUrlResponse>, AppError> {
    let video_id = query
        .video_id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("video_id 필수".to_string()))?;

    if !state.history.has_video(&user.email, &video_id).await? {
        return Err(AppError::NotFound("해당 PDF를 찾을 수 없습니다.".to_string()));
    }

    let path = keys::report_cdn_path(user.email_prefix(), &video_id);
    let signed_url = state
        .report_signer
        .sign_path(&path)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(SignedUrlResponse { signed_url }))
}

#[derive(Deserialize)]
pub struct FeedbackZipRequest {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

/// POST /api/download/feedback-zip/
pub async fn handle_feedback_zip(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<FeedbackZipRequest>,
) -> Result<impl IntoResponse, AppError> {
    let video_id = req
        .video_id
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation("videoId 필수".to_string()))?;

    let prefix = user.email_prefix();
    let bucket = &state.config.clip_bucket;
    let video_prefix = format!("{}{video_id}_", keys::clips_prefix(prefix));

    let members: Vec<String> = state
        .storage
        .list(bucket, &keys::clips_prefix(prefix))
        .await?
        .into_iter()
        .map(|o| o.key)
        .filter(|k| is_archive_member(k, &video_prefix))
        .collect();
    if members.is_empty() {
        return Err(AppError::NotFound("다운로드할 파일이 없습니다.".to_string()));
    }

    let mut entries: Vec<(String, Bytes)> = Vec::with_capacity(members.len());
    for key in members {
        match state.storage.get(bucket, &key).await {
            Ok(data) => entries.push((key, data)),
            Err(e) => warn!("Leaving {key} out of the archive: {e}"),
        }
    }

    let count = entries.len();
    let archive = tokio::task::spawn_blocking(move || build_zip(&entries))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in zip build: {e}")))??;
    info!("Built feedback archive for {video_id}: {count} files, {} bytes", archive.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{video_id}_feedback.zip\""),
            ),
        ],
        archive,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_posture_total_sums_segment_map() {
        assert_eq!(posture_total(&json!({"q1": 2, "q2": 3})), 5);
        assert_eq!(posture_total(&json!(4)), 4);
        assert_eq!(posture_total(&Value::Null), 0);
        assert_eq!(posture_total(&json!({"q1": "x", "q2": 1})), 1);
    }

    #[test]
    fn test_generate_request_accepts_analysis_without_transcript() {
        let req: GenerateFeedbackRequest = serde_json::from_value(json!({
            "analysis": {
                "upload_id": "0614-1",
                "voice_tremor": "안정적",
                "pitch_std": 14.2,
                "speech_rate": 1.9,
                "silence_ratio": 0.31,
                "emotion": "침착함",
                "posture_count": {"q1": 1}
            }
        }))
        .unwrap();
        assert!(req.analysis.transcribe_text.is_none());
        assert_eq!(req.analysis.upload_id.as_deref(), Some("0614-1"));
    }

    #[test]
    fn test_zip_request_reads_camel_case_id() {
        let req: FeedbackZipRequest = serde_json::from_str(r#"{"videoId":"0614-2"}"#).unwrap();
        assert_eq!(req.video_id.as_deref(), Some("0614-2"));
    }
}
