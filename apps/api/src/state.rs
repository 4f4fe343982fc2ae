use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::cognito::IdentityClient;
use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::feedback::{FeedbackHistory, ScoreCache};
use crate::followup::KeywordExtractor;
use crate::llm_client::LlmClient;
use crate::queue::QuestionQueue;
use crate::storage::cloudfront::ReportUrlSigner;
use crate::storage::ObjectStore;
use crate::transcribe::{QuestionHub, Transcriber, UploadSessions};
use crate::tts::SpeechSynthesizer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub storage: ObjectStore,
    pub http: reqwest::Client,
    pub llm: LlmClient,
    pub config: Config,

    pub identity: IdentityClient,
    pub verifier: Arc<JwtVerifier>,

    pub queue: QuestionQueue,
    pub score_cache: ScoreCache,
    pub history: FeedbackHistory,
    pub report_signer: Arc<ReportUrlSigner>,

    /// Pluggable backends, picked at startup from config.
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub keywords: Arc<dyn KeywordExtractor>,

    /// Today's upload id per user.
    pub sessions: UploadSessions,
    /// Open `/ws/questions` connections, keyed by email.
    pub question_hub: QuestionHub,
}
