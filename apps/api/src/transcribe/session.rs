//! Upload session ids: `{MMDD}-{n}`, one per user per interview day.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing::info;

use crate::errors::AppError;
use crate::storage::{keys, ObjectStore};

#[derive(Debug, Clone)]
struct Session {
    day: String,
    upload_id: String,
}

/// Current upload id per email. An id is reused for the rest of the day and
/// recomputed once the day changes.
#[derive(Clone, Default)]
pub struct UploadSessions {
    inner: Arc<Mutex<HashMap<String, Session>>>,
}

impl UploadSessions {
    fn cached(&self, email: &str, day: &str) -> Option<String> {
        let sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(email)
            .filter(|s| s.day == day)
            .map(|s| s.upload_id.clone())
    }

    /// Stores `upload_id` unless a concurrent caller already stored one for
    /// the same day, and returns whichever id won.
    fn remember(&self, email: &str, day: &str, upload_id: String) -> String {
        let mut sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(email) {
            Some(existing) if existing.day == day => existing.upload_id.clone(),
            _ => {
                sessions.insert(
                    email.to_string(),
                    Session {
                        day: day.to_string(),
                        upload_id: upload_id.clone(),
                    },
                );
                upload_id
            }
        }
    }

    pub async fn resolve(
        &self,
        storage: &ObjectStore,
        bucket: &str,
        email: &str,
    ) -> Result<String, AppError> {
        let day = Local::now().format("%m%d").to_string();
        if let Some(id) = self.cached(email, &day) {
            return Ok(id);
        }

        let prefix = keys::email_prefix(email);
        let existing = storage
            .list(bucket, &keys::session_day_prefix(prefix, &day))
            .await?;
        let upload_id = next_upload_id(&day, existing.iter().map(|o| o.key.as_str()));
        let upload_id = self.remember(email, &day, upload_id);
        info!("Upload session for {email}: {upload_id}");
        Ok(upload_id)
    }
}

/// `{day}-{n}` where `n` is one more than the number of distinct
/// `{day}-*` session folders among `keys` (`{prefix}/{session}/...`).
pub fn next_upload_id<'a>(day: &str, keys: impl Iterator<Item = &'a str>) -> String {
    let marker = format!("{day}-");
    let sessions: HashSet<&str> = keys
        .filter_map(|key| key.split('/').nth(1))
        .filter(|segment| segment.starts_with(&marker))
        .collect();
    format!("{day}-{}", sessions.len() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_session_of_the_day() {
        assert_eq!(next_upload_id("0610", std::iter::empty()), "0610-1");
    }

    #[test]
    fn test_counts_distinct_sessions() {
        let keys = [
            "kim/0610-1/wavs/live_q1.wav",
            "kim/0610-1/text/live_q1.txt",
            "kim/0610-2/wavs/live_q1.wav",
            "kim/0609-4/wavs/live_q1.wav",
            "kim",
        ];
        assert_eq!(next_upload_id("0610", keys.into_iter()), "0610-3");
    }

    #[test]
    fn test_remember_keeps_first_id_for_the_day() {
        let sessions = UploadSessions::default();
        assert_eq!(sessions.remember("kim@x.com", "0610", "0610-1".into()), "0610-1");
        assert_eq!(sessions.remember("kim@x.com", "0610", "0610-2".into()), "0610-1");
        assert_eq!(sessions.cached("kim@x.com", "0610").as_deref(), Some("0610-1"));
    }

    #[test]
    fn test_new_day_replaces_session() {
        let sessions = UploadSessions::default();
        sessions.remember("kim@x.com", "0610", "0610-1".into());
        assert!(sessions.cached("kim@x.com", "0611").is_none());
        assert_eq!(sessions.remember("kim@x.com", "0611", "0611-1".into()), "0611-1");
    }
}
