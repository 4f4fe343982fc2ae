pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::contact::handlers as contact;
use crate::feedback::handlers as feedback;
use crate::followup::handlers as followup;
use crate::questions::handlers as questions;
use crate::resume::handlers as resume;
use crate::state::AppState;
use crate::transcribe::handlers as transcribe;
use crate::tts::handlers as tts;
use crate::video::handlers as video;
use crate::voice::handlers as voice;

/// Interview recordings arrive as one webm per question.
const VIDEO_UPLOAD_LIMIT_BYTES: usize = 512 * 1024 * 1024;
const DOCUMENT_UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Accounts
        .route("/api/signup/", post(auth::handle_signup))
        .route("/api/confirm-email/", post(auth::handle_confirm_email))
        .route("/api/login/", post(auth::handle_login))
        .route("/api/logout/", post(auth::handle_logout))
        // Resume
        .route("/api/resume/", get(resume::handle_get_resume))
        .route(
            "/api/resume/upload/",
            post(resume::handle_upload_resume)
                .layer(DefaultBodyLimit::max(DOCUMENT_UPLOAD_LIMIT_BYTES)),
        )
        .route("/api/resume/delete/", delete(resume::handle_delete_resume))
        .route("/api/get-resume-text/", get(resume::handle_get_resume_text))
        // Questions
        .route(
            "/api/generate-resume-questions/",
            post(questions::handle_generate_resume_questions),
        )
        .route("/api/get_all_questions/", get(questions::handle_get_all_questions))
        .route("/api/questions/audio/", get(questions::handle_question_audio))
        .route("/api/followup/check/", post(followup::handle_followup_check))
        // Speech synthesis
        .route(
            "/api/generate-followup-question/tts/",
            post(tts::handle_followup_tts),
        )
        .route(
            "/api/generate-resume-question/",
            post(tts::handle_resume_question_tts),
        )
        // Live transcription
        .route("/ws/transcribe", get(transcribe::handle_transcribe_ws))
        .route("/ws/questions", get(transcribe::handle_questions_ws))
        .route("/internal/send-question", post(transcribe::handle_send_question))
        .route(
            "/api/save_transcribed_text/",
            post(transcribe::handle_save_transcript),
        )
        .route("/api/transcript/", post(transcribe::handle_save_transcript))
        .route("/api/audio/upload/", post(transcribe::handle_audio_upload))
        // Voice and posture
        .route("/api/analyze-voice/", post(voice::handle_analyze_voice))
        .route("/api/posture/", post(voice::handle_posture_count))
        .route("/api/posture/segments", post(voice::handle_posture_count))
        // Feedback
        .route(
            "/api/interview/feedback/generate/",
            post(feedback::handle_generate_feedback),
        )
        .route(
            "/api/upload/pdf/",
            post(feedback::handle_upload_pdf)
                .layer(DefaultBodyLimit::max(DOCUMENT_UPLOAD_LIMIT_BYTES)),
        )
        .route("/api/feedback/history/", get(feedback::handle_feedback_history))
        .route("/api/get-signed-url/", get(feedback::handle_signed_url))
        .route(
            "/api/download/feedback-zip/",
            post(feedback::handle_feedback_zip),
        )
        // Interview video
        .route(
            "/api/video/upload-question-clip/",
            post(video::handle_upload_question_clip)
                .layer(DefaultBodyLimit::max(VIDEO_UPLOAD_LIMIT_BYTES)),
        )
        .route(
            "/api/video/extract-question-clip-segments/",
            post(video::handle_extract_segments),
        )
        .route(
            "/api/video/get-clips-and-segments/",
            post(video::handle_get_clips),
        )
        // Misc
        .route("/api/contact/", post(contact::handle_contact))
        .merge(health::router())
        .with_state(state)
}
