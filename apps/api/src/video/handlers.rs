use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::multipart::MultipartForm;
use crate::questions::numbering::number_from_value;
use crate::state::AppState;
use crate::storage::keys;
use crate::video::ffmpeg::{cut_clip, extract_thumbnail, transcode_to_mp4, Segment};

const CLIP_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Serialize)]
pub struct ClipUploadResponse {
    pub message: &'static str,
    pub video_path: String,
}

/// POST /api/video/upload-question-clip/
pub async fn handle_upload_question_clip(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<ClipUploadResponse>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let missing = || AppError::Validation("필수 값 누락".to_string());
    let video = form.take_file("video").ok_or_else(missing)?;
    let question_id = form.field("question_id").ok_or_else(missing)?.to_string();
    let interview_id = form.field("interview_id").ok_or_else(missing)?.to_string();

    let key = keys::full_clip_key(user.email_prefix(), &interview_id, &question_id);
    state
        .storage
        .put(&state.config.clip_bucket, &key, video.data, "video/webm")
        .await?;

    Ok(Json(ClipUploadResponse {
        message: "질문 영상 업로드 완료",
        video_path: key,
    }))
}

#[derive(Deserialize)]
pub struct ExtractSegmentsRequest {
    pub interview_id: Option<String>,
    /// Number or string, depending on the client.
    pub question_id: Option<Value>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub feedbacks: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct ExtractedClip {
    pub clip_url: String,
    pub thumbnail_url: String,
    pub feedback: Value,
}

#[derive(Serialize)]
pub struct ExtractSegmentsResponse {
    pub message: &'static str,
    pub clips: Vec<ExtractedClip>,
}

/// Feedback paired with segment `index`, or an empty string.
fn feedback_for(feedbacks: &[Value], index: usize) -> Value {
    feedbacks
        .get(index)
        .cloned()
        .unwrap_or_else(|| Value::from(""))
}

/// POST /api/video/extract-question-clip-segments/
pub async fn handle_extract_segments(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ExtractSegmentsRequest>,
) -> Result<Json<ExtractSegmentsResponse>, AppError> {
    let missing = || AppError::Validation("interview_id, question_id, segments 필수".to_string());
    let interview_id = req
        .interview_id
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(missing)?;
    let question_id = number_from_value(req.question_id).ok_or_else(missing)?;
    if req.segments.is_empty() {
        return Err(missing());
    }

    let prefix = user.email_prefix();
    let bucket = &state.config.clip_bucket;
    let source = state
        .storage
        .get(bucket, &keys::full_clip_key(prefix, &interview_id, &question_id))
        .await?;

    let workdir = tempfile::tempdir()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("creating work dir: {e}")))?;
    let webm = workdir.path().join("full.webm");
    let mp4 = workdir.path().join("full.mp4");
    tokio::fs::write(&webm, &source)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("writing {}: {e}", webm.display())))?;
    transcode_to_mp4(&webm, &mp4).await.map_err(AppError::Internal)?;
    info!("Transcoded {interview_id}/q{question_id} to mp4");

    let mut clips = Vec::new();
    for (index, segment) in req.segments.iter().enumerate() {
        let number = index + 1;
        if !segment.is_valid() {
            error!("Skipping segment {number}: invalid range {} ~ {}", segment.start, segment.end);
            continue;
        }
        match extract_one(&state, prefix, &interview_id, &question_id, number, *segment, &mp4, workdir.path()).await {
            Ok((clip_url, thumbnail_url)) => clips.push(ExtractedClip {
                clip_url,
                thumbnail_url,
                feedback: feedback_for(&req.feedbacks, index),
            }),
            Err(e) => error!("Segment {number} failed: {e}"),
        }
    }

    info!("Extracted {}/{} segments for {interview_id}/q{question_id}", clips.len(), req.segments.len());
    Ok(Json(ExtractSegmentsResponse {
        message: "클립 segment 처리 완료",
        clips,
    }))
}

/// Cuts, thumbnails and uploads one segment; returns presigned clip and thumbnail URLs.
#[allow(clippy::too_many_arguments)]
async fn extract_one(
    state: &AppState,
    prefix: &str,
    interview_id: &str,
    question_id: &str,
    number: usize,
    segment: Segment,
    source: &Path,
    workdir: &Path,
) -> Result<(String, String), AppError> {
    let clip_path = workdir.join(format!("seg{number}.mp4"));
    let thumb_path = workdir.join(format!("thumb{number}.jpg"));

    cut_clip(source, segment, &clip_path).await.map_err(AppError::Internal)?;
    extract_thumbnail(source, segment.midpoint(), &thumb_path)
        .await
        .map_err(AppError::Internal)?;

    let clip_bytes = read_output(&clip_path).await?;
    let thumb_bytes = read_output(&thumb_path).await?;

    let bucket = &state.config.clip_bucket;
    let clip_key = keys::clip_key(prefix, interview_id, question_id, number);
    let thumb_key = keys::thumbnail_key(prefix, interview_id, question_id, number);
    state.storage.put(bucket, &clip_key, clip_bytes, "video/mp4").await?;
    state.storage.put(bucket, &thumb_key, thumb_bytes, "image/jpeg").await?;

    let clip_url = state.storage.presigned_get(bucket, &clip_key, CLIP_URL_TTL).await?;
    let thumbnail_url = state.storage.presigned_get(bucket, &thumb_key, CLIP_URL_TTL).await?;
    Ok((clip_url, thumbnail_url))
}

async fn read_output(path: &Path) -> Result<Vec<u8>, AppError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("reading {}: {e}", path.display())))
}

#[derive(Deserialize)]
pub struct ClipsRequest {
    pub interview_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoredClip {
    #[serde(rename = "clipUrl")]
    pub clip_url: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: Option<String>,
    pub feedback: &'static str,
}

#[derive(Serialize)]
pub struct ClipsResponse {
    pub clips: Vec<StoredClip>,
}

/// POST /api/video/get-clips-and-segments/
pub async fn handle_get_clips(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ClipsRequest>,
) -> Result<Json<ClipsResponse>, AppError> {
    let interview_id = req
        .interview_id
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation("interview_id는 필수입니다.".to_string()))?;

    let prefix = user.email_prefix();
    let bucket = &state.config.clip_bucket;
    let clip_prefix = format!("{}{interview_id}_", keys::clips_prefix(prefix));

    let clip_keys: Vec<String> = state
        .storage
        .list_keys_with_suffix(bucket, &keys::clips_prefix(prefix), ".mp4")
        .await?
        .into_iter()
        .filter(|k| k.starts_with(&clip_prefix))
        .collect();
    if clip_keys.is_empty() {
        info!("No clips for {prefix}/{interview_id}");
        return Ok(Json(ClipsResponse { clips: Vec::new() }));
    }

    let thumbnails: HashSet<String> = state
        .storage
        .list_keys_with_suffix(bucket, &keys::thumbnails_prefix(prefix), ".jpg")
        .await?
        .into_iter()
        .collect();

    let mut clips = Vec::with_capacity(clip_keys.len());
    for clip_key in &clip_keys {
        let clip_url = state.storage.presigned_get(bucket, clip_key, CLIP_URL_TTL).await?;
        let thumb_key = keys::thumbnail_for_clip(prefix, clip_key);
        let thumbnail_url = if thumbnails.contains(&thumb_key) {
            Some(state.storage.presigned_get(bucket, &thumb_key, CLIP_URL_TTL).await?)
        } else {
            warn!("No thumbnail for {clip_key}");
            None
        };
        clips.push(StoredClip {
            clip_url,
            thumbnail_url,
            feedback: "",
        });
    }

    Ok(Json(ClipsResponse { clips }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_request_accepts_numeric_question_id() {
        let req: ExtractSegmentsRequest = serde_json::from_value(json!({
            "interview_id": "0614-2",
            "question_id": 3,
            "segments": [{"start": 1.0, "end": 4.5}],
            "feedbacks": ["시선 처리가 불안정합니다."]
        }))
        .unwrap();
        assert_eq!(number_from_value(req.question_id), Some("3".to_string()));
        assert_eq!(req.segments[0], Segment { start: 1.0, end: 4.5 });
    }

    #[test]
    fn test_feedback_defaults_to_empty_string() {
        let feedbacks = vec![json!("첫 번째")];
        assert_eq!(feedback_for(&feedbacks, 0), json!("첫 번째"));
        assert_eq!(feedback_for(&feedbacks, 1), json!(""));
    }

    #[test]
    fn test_stored_clip_uses_camel_case() {
        let body = serde_json::to_value(StoredClip {
            clip_url: "https://clip".into(),
            thumbnail_url: None,
            feedback: "",
        })
        .unwrap();
        assert_eq!(body, json!({"clipUrl": "https://clip", "thumbnailUrl": null, "feedback": ""}));
    }
}
