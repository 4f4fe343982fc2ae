//! Question audio: synthesis through the TTS model and the queue worker that drives it.

pub mod handlers;
pub mod synth;
pub mod worker;

use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::keys;

pub use synth::{HttpSynthesizer, SpeechSynthesizer, VoicePreset};

/// Base questions voiced by the model; 1 and 5 are pre-recorded.
const SYNTHESIZED_QUESTIONS: [&str; 3] = ["questions2.txt", "questions3.txt", "questions4.txt"];

#[derive(Debug, Serialize)]
pub struct GeneratedAudio {
    pub text_file: String,
    pub tts_file_url: String,
}

/// Whether `key` is one of the user's synthesized base-question texts.
pub fn is_synthesized_question(prefix: &str, key: &str) -> bool {
    key.strip_prefix(&keys::user_root(prefix))
        .is_some_and(|name| SYNTHESIZED_QUESTIONS.contains(&name))
}

/// Voices one follow-up question and returns the audio's URL.
pub async fn synthesize_followup(
    state: &AppState,
    prefix: &str,
    question_number: &str,
    text: &str,
) -> Result<String, AppError> {
    let audio = state
        .synthesizer
        .synthesize(text, VoicePreset::Followup)
        .await?;
    let key = keys::tts_audio_key(prefix, question_number);
    state
        .storage
        .put(&state.config.tts_bucket, &key, audio, "audio/wav")
        .await?;
    info!("Follow-up audio ready at {key}");
    Ok(state.storage.public_url(&state.config.tts_bucket, &key))
}

/// Voices the user's generated base questions 2-4 in key order.
pub async fn synthesize_resume_questions(
    state: &AppState,
    prefix: &str,
) -> Result<Vec<GeneratedAudio>, AppError> {
    let config = &state.config;
    let text_keys: Vec<String> = state
        .storage
        .list_keys_with_suffix(&config.question_bucket, &keys::user_root(prefix), ".txt")
        .await?
        .into_iter()
        .filter(|k| is_synthesized_question(prefix, k))
        .collect();
    if text_keys.is_empty() {
        return Err(AppError::NotFound(
            "No text files found in your S3 folder.".to_string(),
        ));
    }

    let mut results = Vec::with_capacity(text_keys.len());
    for text_key in text_keys {
        let text = state.storage.get_text(&config.question_bucket, &text_key).await?;
        let audio = state
            .synthesizer
            .synthesize(text.trim(), VoicePreset::ResumeQuestion)
            .await?;

        let audio_key = format!("{}{}.wav", keys::user_root(prefix), keys::file_stem(&text_key));
        state
            .storage
            .put(&config.tts_bucket, &audio_key, audio, "audio/wav")
            .await?;
        info!("Resume question audio ready at {audio_key}");

        results.push(GeneratedAudio {
            tts_file_url: state.storage.public_url(&config.tts_bucket, &audio_key),
            text_file: text_key,
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_questions_two_to_four_are_synthesized() {
        assert!(is_synthesized_question("kim", "kim/questions2.txt"));
        assert!(is_synthesized_question("kim", "kim/questions4.txt"));
        assert!(!is_synthesized_question("kim", "kim/questions1.txt"));
        assert!(!is_synthesized_question("kim", "kim/questions5.txt"));
        assert!(!is_synthesized_question("kim", "kim/nested/questions2.txt"));
        assert!(!is_synthesized_question("kim", "lee/questions2.txt"));
    }
}
