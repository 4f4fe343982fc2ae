//! Voice analysis over a session's recorded answers, plus posture-event logging.

pub mod analysis;
pub mod handlers;
pub mod wav;

use tracing::{info, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::keys;

/// Every transcript of a session, in key order, separated by blank lines.
/// Unreadable parts are logged and skipped.
pub async fn merge_session_transcripts(
    state: &AppState,
    prefix: &str,
    upload_id: &str,
) -> Result<String, AppError> {
    let bucket = &state.config.audio_bucket;
    let text_keys = state
        .storage
        .list_keys_with_suffix(bucket, &keys::session_text_prefix(prefix, upload_id), ".txt")
        .await?;

    if text_keys.is_empty() {
        warn!("No transcripts under {prefix}/{upload_id}/text/");
    }

    let mut parts = Vec::with_capacity(text_keys.len());
    for key in &text_keys {
        match state.storage.get_text(bucket, key).await {
            Ok(text) => parts.push(text.trim().to_string()),
            Err(e) => warn!("Skipping transcript {key}: {e}"),
        }
    }

    let merged = join_transcripts(&parts);
    info!("Merged {} transcripts for {prefix}/{upload_id} ({} chars)", parts.len(), merged.chars().count());
    Ok(merged)
}

pub fn join_transcripts(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
