use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::queue::TtsJob;
use crate::questions::generator::{generate_interview_questions, Difficulty};
use crate::questions::numbering::{compare_numbers, number_from_stem, parse_audio_number, QuestionAudio};
use crate::resume::pdf::extract_pdf_text;
use crate::state::AppState;
use crate::storage::keys;

/// Question numbers whose audio is pre-recorded rather than synthesized.
const FIXED_AUDIO_NUMBERS: [usize; 2] = [1, 5];

#[derive(Deserialize, Default)]
pub struct GenerateQuestionsRequest {
    /// 쉬움, 중간 or 어려움; 중간 when absent.
    pub difficulty: Option<String>,
}

impl GenerateQuestionsRequest {
    pub fn difficulty(&self) -> Result<Difficulty, AppError> {
        match self.difficulty.as_deref() {
            None => Ok(Difficulty::default()),
            Some(label) => Difficulty::from_label(label).ok_or_else(|| {
                AppError::Validation(format!("지원하지 않는 난이도입니다: {label}"))
            }),
        }
    }
}

#[derive(Serialize)]
pub struct GenerateQuestionsResponse {
    pub message: &'static str,
    pub sqs_message_id: String,
}

#[derive(Serialize)]
pub struct AllQuestionsResponse {
    pub questions: Map<String, Value>,
}

/// POST /api/generate-resume-questions/
pub async fn handle_generate_resume_questions(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<GenerateQuestionsRequest>,
) -> Result<Json<GenerateQuestionsResponse>, AppError> {
    let difficulty = req.difficulty()?;
    let prefix = user.email_prefix();
    let config = &state.config;

    let mut pdfs: Vec<_> = state
        .storage
        .list(&config.resume_bucket, &keys::resume_prefix(prefix))
        .await?
        .into_iter()
        .filter(|o| o.key.ends_with(".pdf"))
        .collect();
    pdfs.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    let latest = pdfs
        .first()
        .ok_or_else(|| AppError::NotFound("PDF 파일이 존재하지 않습니다.".to_string()))?;

    let pdf = state.storage.get(&config.resume_bucket, &latest.key).await?;
    let resume_text = extract_pdf_text(pdf).await?;

    let script = generate_interview_questions(&state.llm, &resume_text, difficulty).await?;
    info!("Final interview script for {prefix}: {} questions", script.len());

    for (idx, question) in script.iter().enumerate() {
        let key = keys::question_text_key(prefix, &(idx + 1).to_string());
        if let Err(e) = state
            .storage
            .put(&config.question_bucket, &key, question.clone(), "text/plain; charset=utf-8")
            .await
        {
            error!("Failed to store question {key}: {e}");
        }
    }

    upload_fixed_audio(&state, prefix).await;

    let message_id = state
        .queue
        .enqueue(&TtsJob::resume_questions(&user.token), prefix)
        .await?;

    Ok(Json(GenerateQuestionsResponse {
        message: "SQS에 요청 성공",
        sqs_message_id: message_id,
    }))
}

/// Copies the pre-recorded intro/closing audio into the user's TTS folder.
async fn upload_fixed_audio(state: &AppState, prefix: &str) {
    for number in FIXED_AUDIO_NUMBERS {
        let path = state
            .config
            .fixed_audio_dir
            .join(format!("questions{number}.wav"));
        let key = keys::tts_audio_key(prefix, &number.to_string());

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) => {
                error!("Fixed audio {} unreadable: {e}", path.display());
                continue;
            }
        };
        match state.storage.put(&state.config.tts_bucket, &key, data, "audio/wav").await {
            Ok(()) => info!("Uploaded fixed audio for question {number}"),
            Err(e) => error!("Fixed audio upload for question {number} failed: {e}"),
        }
    }
}

/// `{number: text}` for every `.txt` under the user's folder in `bucket`.
async fn fetch_questions(
    state: &AppState,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<(String, String)>, AppError> {
    let text_keys = state
        .storage
        .list_keys_with_suffix(bucket, &keys::user_root(prefix), ".txt")
        .await?;

    let mut questions = Vec::with_capacity(text_keys.len());
    for key in text_keys {
        let number = number_from_stem(keys::file_stem(&key)).to_string();
        let text = state.storage.get_text(bucket, &key).await?;
        questions.push((number, text.trim().to_string()));
    }
    Ok(questions)
}

/// Base questions overlaid with follow-ups, ordered by question number.
pub fn merge_questions(
    base: Vec<(String, String)>,
    followups: Vec<(String, String)>,
) -> Map<String, Value> {
    let mut merged: Vec<(String, String)> = Vec::with_capacity(base.len() + followups.len());
    for (number, text) in base.into_iter().chain(followups) {
        match merged.iter_mut().find(|(n, _)| *n == number) {
            Some(existing) => existing.1 = text,
            None => merged.push((number, text)),
        }
    }
    merged.sort_by(|a, b| compare_numbers(&a.0, &b.0));
    merged
        .into_iter()
        .map(|(number, text)| (number, Value::String(text)))
        .collect()
}

/// GET /api/get_all_questions/
pub async fn handle_get_all_questions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AllQuestionsResponse>, AppError> {
    let prefix = user.email_prefix();
    let base = fetch_questions(&state, &state.config.question_bucket, prefix).await?;
    let followups = fetch_questions(&state, &state.config.followup_bucket, prefix).await?;

    Ok(Json(AllQuestionsResponse {
        questions: merge_questions(base, followups),
    }))
}

/// GET /api/questions/audio/
pub async fn handle_question_audio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<QuestionAudio>>, AppError> {
    let bucket = &state.config.tts_bucket;
    let audio_keys = state
        .storage
        .list_keys_with_suffix(bucket, &keys::user_root(user.email_prefix()), ".wav")
        .await?;

    let mut audio: Vec<QuestionAudio> = audio_keys
        .iter()
        .filter_map(|key| match parse_audio_number(keys::file_stem(key)) {
            Some((major, minor)) => Some(QuestionAudio::new(
                major,
                minor,
                state.storage.public_url(bucket, key),
            )),
            None => {
                warn!("Skipping unrecognised audio key {key}");
                None
            }
        })
        .collect();
    audio.sort_by(|a, b| a.order.total_cmp(&b.order));

    Ok(Json(audio))
}
