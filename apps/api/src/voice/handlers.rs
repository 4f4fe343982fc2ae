use std::time::Instant;

use axum::{extract::State, Json};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::keys;
use crate::voice::analysis::{analyze, duration_seconds, round2, VoiceMetrics};
use crate::voice::merge_session_transcripts;
use crate::voice::wav::{concat_wavs, encode_wav};

#[derive(Deserialize)]
pub struct AnalyzeVoiceRequest {
    pub upload_id: Option<String>,
    #[serde(default = "zero")]
    pub posture_count: Value,
}

fn zero() -> Value {
    Value::from(0)
}

#[derive(Serialize)]
pub struct VoiceAnalysis {
    #[serde(flatten)]
    pub metrics: VoiceMetrics,
    pub posture_count: Value,
    pub transcribe_text: String,
}

#[derive(Serialize)]
pub struct AnalyzeVoiceResponse {
    pub analysis: VoiceAnalysis,
    pub response_time_seconds: f64,
}

/// POST /api/analyze-voice/
pub async fn handle_analyze_voice(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AnalyzeVoiceRequest>,
) -> Result<Json<AnalyzeVoiceResponse>, AppError> {
    let started = Instant::now();
    let upload_id = req
        .upload_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("upload_id 필수".to_string()))?;
    let prefix = user.email_prefix();
    let bucket = &state.config.audio_bucket;

    let wav_keys = state
        .storage
        .list_keys_with_suffix(bucket, &keys::session_audio_prefix(prefix, &upload_id), ".wav")
        .await?;
    if wav_keys.is_empty() {
        return Err(AppError::NotFound("오디오 파일을 찾을 수 없습니다.".to_string()));
    }

    let mut files: Vec<Bytes> = Vec::with_capacity(wav_keys.len());
    for key in &wav_keys {
        files.push(state.storage.get(bucket, key).await?);
    }

    let (samples, rate, merged_wav) = tokio::task::spawn_blocking(move || {
        let (samples, rate) = concat_wavs(&files)?;
        let merged = encode_wav(&samples, rate)?;
        anyhow::Ok((samples, rate, merged))
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in audio merge: {e}")))??;
    info!(
        "Merged {} answers for {prefix}/{upload_id}: {:.1}s",
        wav_keys.len(),
        duration_seconds(&samples, rate)
    );

    state
        .storage
        .put(bucket, &keys::merged_audio_key(prefix, &upload_id), merged_wav, "audio/wav")
        .await?;

    let transcribe_text = merge_session_transcripts(&state, prefix, &upload_id).await?;

    let text = transcribe_text.clone();
    let metrics = tokio::task::spawn_blocking(move || analyze(&samples, rate, &text))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in voice analysis: {e}")))?;

    Ok(Json(AnalyzeVoiceResponse {
        analysis: VoiceAnalysis {
            metrics,
            posture_count: req.posture_count,
            transcribe_text,
        },
        response_time_seconds: round2(started.elapsed().as_secs_f64()),
    }))
}

#[derive(Deserialize)]
pub struct PostureCount {
    #[serde(default)]
    pub count: Value,
}

#[derive(Serialize)]
pub struct PostureAck {
    pub message: &'static str,
    pub count: Value,
}

/// POST /api/posture/ and /api/posture/segments
pub async fn handle_posture_count(Json(req): Json<PostureCount>) -> Json<PostureAck> {
    info!("Posture event count received: {}", req.count);
    Json(PostureAck {
        message: "count 수신 완료",
        count: req.count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_serializes_flat() {
        let analysis = VoiceAnalysis {
            metrics: VoiceMetrics {
                pitch_std: 12.5,
                voice_tremor: "안정적",
                speech_rate: 1.8,
                silence_ratio: 0.25,
                emotion: "침착함",
            },
            posture_count: serde_json::json!({"q1": 2}),
            transcribe_text: "답변".into(),
        };
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["pitch_std"], 12.5);
        assert_eq!(value["voice_tremor"], "안정적");
        assert_eq!(value["posture_count"]["q1"], 2);
        assert_eq!(value["transcribe_text"], "답변");
    }

    #[test]
    fn test_missing_posture_count_defaults_to_zero() {
        let req: AnalyzeVoiceRequest = serde_json::from_str(r#"{"upload_id":"0610-1"}"#).unwrap();
        assert_eq!(req.posture_count, 0);
    }
}
