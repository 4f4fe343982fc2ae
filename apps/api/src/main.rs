mod auth;
mod config;
mod contact;
mod db;
mod errors;
mod feedback;
mod followup;
mod llm_client;
mod models;
mod multipart;
mod queue;
mod questions;
mod resume;
mod routes;
mod state;
mod storage;
mod transcribe;
mod tts;
mod video;
mod voice;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::cognito::IdentityClient;
use crate::auth::JwtVerifier;
use crate::config::{Config, KeywordBackend, LogFormat};
use crate::db::create_pool;
use crate::feedback::{FeedbackHistory, ScoreCache};
use crate::followup::{KeywordExtractor, LlmKeywordExtractor, TermFrequencyExtractor};
use crate::llm_client::LlmClient;
use crate::queue::QuestionQueue;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::cloudfront::ReportUrlSigner;
use crate::storage::ObjectStore;
use crate::transcribe::{AwsTranscriber, QuestionHub, UploadSessions};
use crate::tts::HttpSynthesizer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    init_tracing(&config);
    info!("Starting Knok API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis (feedback score cache)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Shared AWS config; credentials come from the default provider chain
    let aws = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;

    let storage = ObjectStore::new(build_s3_client(&aws, &config), config.aws_region.clone());
    info!("S3 client initialized");

    let http = reqwest::Client::new();

    let llm = LlmClient::new(build_bedrock_client(&aws, &config));
    info!("LLM client initialized (region: {})", config.bedrock_region);

    let keywords: Arc<dyn KeywordExtractor> = match config.keyword_backend {
        KeywordBackend::Frequency => Arc::new(TermFrequencyExtractor),
        KeywordBackend::Llm => Arc::new(LlmKeywordExtractor::new(llm.clone())),
    };
    info!("Keyword extractor: {:?}", config.keyword_backend);

    let state = AppState {
        db,
        storage,
        http: http.clone(),
        llm,
        identity: IdentityClient::new(
            aws_sdk_cognitoidentityprovider::Client::new(&aws),
            config.cognito_client_id.clone(),
            config.cognito_client_secret.clone(),
        ),
        verifier: Arc::new(JwtVerifier::new(
            http.clone(),
            config.cognito_issuer(),
            config.cognito_client_id.clone(),
        )),
        queue: QuestionQueue::new(
            aws_sdk_sqs::Client::new(&aws),
            config.question_queue_url.clone(),
        ),
        score_cache: ScoreCache::new(redis),
        history: FeedbackHistory::new(
            aws_sdk_dynamodb::Client::new(&aws),
            config.feedback_table.clone(),
        ),
        report_signer: Arc::new(ReportUrlSigner::new(
            aws_sdk_secretsmanager::Client::new(&aws),
            config.cloudfront_secret_name.clone(),
            config.cloudfront_key_pair_id.clone(),
            cdn_origin(&config.cloudfront_domain),
        )),
        transcriber: Arc::new(AwsTranscriber::new(
            aws_sdk_transcribestreaming::Client::new(&aws),
        )),
        synthesizer: Arc::new(HttpSynthesizer::new(http, config.tts_endpoint.clone())),
        keywords,
        sessions: UploadSessions::default(),
        question_hub: QuestionHub::default(),
        config: config.clone(),
    };

    if config.enable_tts_worker {
        tts::worker::spawn_worker(state.clone());
    }

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web client's domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
    });
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// S3 client for AWS, or for MinIO when `S3_ENDPOINT` is set.
fn build_s3_client(aws: &SdkConfig, config: &Config) -> aws_sdk_s3::Client {
    let mut builder = aws_sdk_s3::config::Builder::from(aws);
    if let Some(endpoint) = &config.s3_endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}

fn build_bedrock_client(aws: &SdkConfig, config: &Config) -> aws_sdk_bedrockruntime::Client {
    let bedrock = aws_sdk_bedrockruntime::config::Builder::from(aws)
        .region(Region::new(config.bedrock_region.clone()))
        .build();
    aws_sdk_bedrockruntime::Client::from_conf(bedrock)
}

/// `CLOUDFRONT_DOMAIN` may be a bare host name.
fn cdn_origin(domain: &str) -> String {
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdn_origin_adds_scheme_to_bare_host() {
        assert_eq!(cdn_origin("d1.cloudfront.net"), "https://d1.cloudfront.net");
        assert_eq!(cdn_origin("https://cdn.knok.kr"), "https://cdn.knok.kr");
    }
}
