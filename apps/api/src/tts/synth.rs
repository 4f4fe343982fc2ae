use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::errors::AppError;

const LANGUAGE: &str = "ko";
const SPEAKING_RATE: f32 = 23.0;
const PITCH_STD: f32 = 20.0;

/// Emotion mix for the interviewer voice. The last of the eight weights is
/// "neutral"; the first is "happiness".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePreset {
    Followup,
    ResumeQuestion,
}

impl VoicePreset {
    pub fn emotion(self) -> [f32; 8] {
        match self {
            VoicePreset::Followup => [0.05, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.95],
            VoicePreset::ResumeQuestion => [0.10, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.90],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub language: &'a str,
    pub emotion: [f32; 8],
    pub speaking_rate: f32,
    pub pitch_std: f32,
}

impl<'a> SynthesisRequest<'a> {
    pub fn new(text: &'a str, preset: VoicePreset) -> Self {
        Self {
            text,
            language: LANGUAGE,
            emotion: preset.emotion(),
            speaking_rate: SPEAKING_RATE,
            pitch_std: PITCH_STD,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SpeechSynthesizer trait
// ─────────────────────────────────────────────────────────────────────────────

/// Turns question text into WAV audio in the interviewer's cloned voice.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, preset: VoicePreset) -> Result<Bytes, AppError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HttpSynthesizer — the model runs behind an inference endpoint
// ─────────────────────────────────────────────────────────────────────────────

pub struct HttpSynthesizer {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpSynthesizer {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, preset: VoicePreset) -> Result<Bytes, AppError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&SynthesisRequest::new(text, preset))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Synthesis(format!("TTS request failed: {e}")))?;

        let audio = response
            .bytes()
            .await
            .map_err(|e| AppError::Synthesis(format!("reading TTS audio failed: {e}")))?;
        if audio.is_empty() {
            return Err(AppError::Synthesis("TTS returned no audio".to_string()));
        }

        debug!("Synthesized {} chars into {} bytes ({preset:?})", text.chars().count(), audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(SynthesisRequest::new("안녕하세요", VoicePreset::Followup)).unwrap();
        assert_eq!(body["text"], "안녕하세요");
        assert_eq!(body["language"], "ko");
        assert_eq!(body["speaking_rate"], 23.0);
        assert_eq!(body["pitch_std"], 20.0);
        assert_eq!(body["emotion"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_presets_are_mostly_neutral() {
        for preset in [VoicePreset::Followup, VoicePreset::ResumeQuestion] {
            let emotion = preset.emotion();
            let total: f32 = emotion.iter().sum();
            assert!((total - 1.0).abs() < 1e-6);
            assert!(emotion[7] >= 0.9);
        }
        assert_eq!(VoicePreset::ResumeQuestion.emotion()[0], 0.10);
    }
}
