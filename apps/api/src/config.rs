use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,

    pub aws_region: String,
    /// Bedrock is only served from a subset of regions, so it gets its own.
    pub bedrock_region: String,
    /// Optional S3-compatible endpoint (MinIO) for local development.
    pub s3_endpoint: Option<String>,

    pub resume_bucket: String,
    /// Public domain fronting the resume bucket; resume URLs are built from it.
    pub s3_custom_domain: String,
    pub question_bucket: String,
    pub followup_bucket: String,
    pub tts_bucket: String,
    pub audio_bucket: String,
    pub clip_bucket: String,

    pub feedback_table: String,
    pub question_queue_url: String,

    pub cognito_user_pool_id: String,
    pub cognito_client_id: String,
    pub cognito_client_secret: String,

    pub cloudfront_domain: String,
    pub cloudfront_key_pair_id: String,
    pub cloudfront_secret_name: String,

    pub tts_endpoint: String,
    pub transcript_callback_url: String,
    pub slack_webhook_url: Option<String>,
    pub fixed_audio_dir: PathBuf,

    pub keyword_backend: KeywordBackend,
    pub enable_tts_worker: bool,

    pub port: u16,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Which keyword extractor backs the follow-up decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordBackend {
    Frequency,
    Llm,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,

            aws_region: env_or("AWS_REGION", "ap-northeast-2"),
            bedrock_region: env_or("BEDROCK_REGION", "us-east-1"),
            s3_endpoint: optional_env("S3_ENDPOINT"),

            resume_bucket: require_env("RESUME_BUCKET")?,
            s3_custom_domain: require_env("S3_CUSTOM_DOMAIN")?,
            question_bucket: env_or("QUESTION_BUCKET", "resume-questions"),
            followup_bucket: env_or("FOLLOWUP_BUCKET", "knok-followup-questions"),
            tts_bucket: require_env("TTS_BUCKET")?,
            audio_bucket: require_env("AUDIO_BUCKET")?,
            clip_bucket: require_env("CLIP_BUCKET")?,

            feedback_table: env_or("FEEDBACK_TABLE", "feedback_reports"),
            question_queue_url: require_env("QUESTION_QUEUE_URL")?,

            cognito_user_pool_id: require_env("COGNITO_USER_POOL_ID")?,
            cognito_client_id: require_env("COGNITO_APP_CLIENT_ID")?,
            cognito_client_secret: require_env("COGNITO_APP_CLIENT_SECRET")?,

            cloudfront_domain: require_env("CLOUDFRONT_DOMAIN")?,
            cloudfront_key_pair_id: require_env("CLOUDFRONT_KEY_PAIR_ID")?,
            cloudfront_secret_name: require_env("CLOUDFRONT_SECRET_NAME")?,

            tts_endpoint: require_env("TTS_ENDPOINT")?,
            transcript_callback_url: require_env("TRANSCRIPT_CALLBACK_URL")?,
            slack_webhook_url: optional_env("SLACK_WEBHOOK_URL"),
            fixed_audio_dir: PathBuf::from(env_or("FIXED_AUDIO_DIR", "/app/audio")),

            keyword_backend: parse_keyword_backend(&env_or("KEYWORD_EXTRACTOR", "frequency"))?,
            enable_tts_worker: env_or("ENABLE_TTS_WORKER", "false")
                .parse::<bool>()
                .context("ENABLE_TTS_WORKER must be true or false")?,

            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            log_format: parse_log_format(&env_or("LOG_FORMAT", "pretty"))?,
        })
    }

    /// Issuer claim expected on Cognito-issued tokens.
    pub fn cognito_issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.aws_region, self.cognito_user_pool_id
        )
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_log_format(raw: &str) -> Result<LogFormat> {
    match raw.to_ascii_lowercase().as_str() {
        "pretty" | "text" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{other}'"),
    }
}

fn parse_keyword_backend(raw: &str) -> Result<KeywordBackend> {
    match raw.to_ascii_lowercase().as_str() {
        "frequency" => Ok(KeywordBackend::Frequency),
        "llm" => Ok(KeywordBackend::Llm),
        other => anyhow::bail!("KEYWORD_EXTRACTOR must be 'frequency' or 'llm', got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_accepts_json_case_insensitive() {
        assert_eq!(parse_log_format("JSON").unwrap(), LogFormat::Json);
        assert_eq!(parse_log_format("pretty").unwrap(), LogFormat::Pretty);
        assert!(parse_log_format("xml").is_err());
    }

    #[test]
    fn test_keyword_backend_parsing() {
        assert_eq!(
            parse_keyword_backend("frequency").unwrap(),
            KeywordBackend::Frequency
        );
        assert_eq!(parse_keyword_backend("LLM").unwrap(), KeywordBackend::Llm);
        assert!(parse_keyword_backend("keybert").is_err());
    }
}
