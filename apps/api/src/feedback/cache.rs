//! Short-lived score cache bridging report generation and PDF archival.

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;

pub const SCORE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedScore {
    pub user_email: String,
    pub score: f64,
    pub emoji: String,
}

pub fn cache_key(email: &str) -> String {
    format!("feedback_cache:{email}")
}

#[derive(Clone)]
pub struct ScoreCache {
    client: redis::Client,
}

impl ScoreCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub async fn store(&self, entry: &CachedScore) -> Result<(), AppError> {
        let payload = serde_json::to_string(entry)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("serializing cached score: {e}")))?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn
            .set_ex(cache_key(&entry.user_email), payload, SCORE_TTL_SECS)
            .await?;
        debug!("Cached score {} for {}", entry.score, entry.user_email);
        Ok(())
    }

    /// The cached score, or `None` when it expired or was never set.
    pub async fn load(&self, email: &str) -> Result<Option<CachedScore>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(cache_key(email)).await?;
        Ok(payload.and_then(|p| serde_json::from_str(&p).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_uses_full_email() {
        assert_eq!(cache_key("kim@example.com"), "feedback_cache:kim@example.com");
    }

    #[test]
    fn test_cached_score_shape() {
        let entry = CachedScore {
            user_email: "kim@example.com".into(),
            score: 81.0,
            emoji: "🙂".into(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["score"], 81.0);
        assert_eq!(value["emoji"], "🙂");
    }
}
