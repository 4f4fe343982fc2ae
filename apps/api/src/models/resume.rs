use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One uploaded resume per user, keyed by the identity-provider subject.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_sub: String,
    pub user_email: String,
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
}
