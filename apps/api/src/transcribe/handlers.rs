use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::state::AppState;
use crate::storage::keys;
use crate::transcribe::refine::refine_transcript;
use crate::transcribe::relay::{relay, RelayOutcome};
use crate::voice::wav::{pcm16_to_wav, LIVE_SAMPLE_RATE};

const AUDIO_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Deserialize)]
pub struct TranscribeParams {
    pub email: String,
    pub question_id: String,
    /// Bearer token forwarded to the transcript callback.
    pub token: String,
}

/// GET /ws/transcribe
pub async fn handle_transcribe_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<TranscribeParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| transcribe_session(socket, state, params))
}

async fn transcribe_session(socket: WebSocket, state: AppState, params: TranscribeParams) {
    info!(
        "Transcription socket opened for {} (question {})",
        params.email, params.question_id
    );
    let (mut sender, mut receiver) = socket.split();

    let upload_id = match state
        .sessions
        .resolve(&state.storage, &state.config.audio_bucket, &params.email)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            error!("Could not resolve upload session for {}: {e}", params.email);
            let _ = sender.close().await;
            return;
        }
    };

    let announce = json!({ "type": "upload_id", "upload_id": upload_id }).to_string();
    if sender.send(Message::Text(announce)).await.is_err() {
        warn!("Client left before the session started");
        return;
    }

    let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);
    let segments = match state.transcriber.start(audio_rx).await {
        Ok(segments) => segments,
        Err(e) => {
            error!("Transcriber failed to start: {e}");
            let _ = sender.close().await;
            return;
        }
    };

    let outcome = relay(&mut receiver, &mut sender, audio_tx, segments).await;
    finalize(&state, &params, &upload_id, outcome).await;

    let done = json!({ "status": "done" }).to_string();
    if sender.send(Message::Text(done)).await.is_err() {
        warn!("Client left before the session finished");
    }
    let _ = sender.close().await;
    info!("Transcription session {upload_id}/q{} complete", params.question_id);
}

/// What a finished answer leaves behind.
#[derive(Debug)]
struct AnswerArtifacts {
    /// `(key, wav)`; absent when no audio arrived or encoding failed.
    audio: Option<(String, Vec<u8>)>,
    /// `(key, refined text)`; absent for a blank transcript.
    text: Option<(String, String)>,
    callback: Value,
}

fn answer_artifacts(
    params: &TranscribeParams,
    upload_id: &str,
    audio: &[u8],
    refined: &str,
) -> AnswerArtifacts {
    let prefix = keys::email_prefix(&params.email);

    let audio = if audio.is_empty() {
        warn!("No audio received; skipping WAV upload");
        None
    } else {
        match pcm16_to_wav(audio, LIVE_SAMPLE_RATE) {
            Ok(wav) => Some((keys::session_audio_key(prefix, upload_id, &params.question_id), wav)),
            Err(e) => {
                error!("Encoding answer audio failed: {e}");
                None
            }
        }
    };

    let text = if refined.trim().is_empty() {
        warn!("Empty transcript; skipping text upload");
        None
    } else {
        Some((
            keys::session_text_key(prefix, upload_id, &params.question_id),
            refined.to_string(),
        ))
    };

    AnswerArtifacts {
        audio,
        text,
        callback: json!({
            "email": params.email,
            "question_id": params.question_id,
            "transcript": refined,
        }),
    }
}

/// Refines the transcript, stores the answer audio and text, and notifies the
/// callback. Every step logs its own failure and the rest still run.
async fn finalize(state: &AppState, params: &TranscribeParams, upload_id: &str, outcome: RelayOutcome) {
    let refined = refine_transcript(&state.llm, &outcome.transcript).await;
    let artifacts = answer_artifacts(params, upload_id, &outcome.audio, &refined);
    let bucket = &state.config.audio_bucket;

    if let Some((key, wav)) = artifacts.audio {
        if let Err(e) = state.storage.put(bucket, &key, wav, "audio/wav").await {
            error!("Saving answer audio failed: {e}");
        }
    }
    if let Some((key, text)) = artifacts.text {
        if let Err(e) = state
            .storage
            .put(bucket, &key, text, "text/plain; charset=utf-8")
            .await
        {
            error!("Saving transcript failed: {e}");
        }
    }

    notify_transcript(state, &params.token, &artifacts.callback).await;
}

async fn notify_transcript(state: &AppState, token: &str, body: &Value) {
    let result = state
        .http
        .post(&state.config.transcript_callback_url)
        .bearer_auth(token)
        .json(body)
        .send()
        .await;

    match result {
        Ok(response) => info!("Transcript callback answered {}", response.status()),
        Err(e) => error!("Transcript callback failed: {e}"),
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionSocketParams {
    pub user_email: String,
}

/// GET /ws/questions
pub async fn handle_questions_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<QuestionSocketParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| question_session(socket, state, params.user_email))
}

async fn question_session(socket: WebSocket, state: AppState, email: String) {
    let (id, mut pushed) = state.question_hub.register(&email);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            payload = pushed.recv() => match payload {
                Some(payload) => {
                    if sender.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.question_hub.unregister(&email, id);
}

#[derive(Debug, Deserialize)]
pub struct SendQuestionRequest {
    pub user_email: String,
    pub question: String,
    #[serde(default)]
    pub question_number: Value,
}

/// POST /internal/send-question
pub async fn handle_send_question(
    State(state): State<AppState>,
    Json(req): Json<SendQuestionRequest>,
) -> Json<Value> {
    let payload = json!({
        "type": "new_question",
        "question": req.question,
        "question_number": req.question_number,
    });
    match state.question_hub.push(&req.user_email, &payload) {
        Ok(()) => {
            info!("Sent question {} to {}", req.question_number, req.user_email);
            Json(json!({ "status": "success" }))
        }
        Err(e) => {
            warn!("Could not push question to {}: {e}", req.user_email);
            Json(json!({ "status": "error", "message": e.to_string() }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranscriptNotice {
    pub email: Option<String>,
    pub question_id: Option<Value>,
    #[serde(default)]
    pub transcript: String,
    pub audio_path: Option<String>,
    pub text_path: Option<String>,
}

#[derive(Serialize)]
pub struct TranscriptAck {
    pub message: &'static str,
    pub audio_path: Option<String>,
    pub text_path: Option<String>,
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}

/// POST /api/save_transcribed_text/ and /api/transcript/
pub async fn handle_save_transcript(Json(notice): Json<TranscriptNotice>) -> Json<TranscriptAck> {
    info!(
        "Transcript received: email={:?}, question_id={:?}, transcript={}",
        notice.email,
        notice.question_id,
        preview(&notice.transcript)
    );
    Json(TranscriptAck {
        message: "음성 저장 완료 (텍스트는 잠시 후 생성됩니다)",
        audio_path: notice.audio_path,
        text_path: notice.text_path,
    })
}

/// POST /api/audio/upload/
pub async fn handle_audio_upload(
    user: AuthUser,
    Json(notice): Json<TranscriptNotice>,
) -> Json<Value> {
    info!(
        "[{}] answer transcript for question {:?}: {}",
        notice.email.as_deref().unwrap_or(&user.email),
        notice.question_id,
        notice.transcript
    );
    Json(json!({ "message": "저장 완료!" }))
}
