use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum PushError {
    #[error("User not connected")]
    NotConnected,
    #[error("connection closed")]
    Closed,
}

struct Connection {
    id: u64,
    tx: mpsc::UnboundedSender<String>,
}

/// Open `/ws/questions` connections by email. A newer connection for the
/// same email replaces the older one.
#[derive(Clone, Default)]
pub struct QuestionHub {
    connections: Arc<Mutex<HashMap<String, Connection>>>,
    next_id: Arc<AtomicU64>,
}

impl QuestionHub {
    pub fn register(&self, email: &str) -> (u64, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(email.to_string(), Connection { id, tx });
        info!("Question socket connected for {email}");
        (id, rx)
    }

    /// Removes the connection unless it was already replaced by a newer one.
    pub fn unregister(&self, email: &str, id: u64) {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        if connections.get(email).is_some_and(|c| c.id == id) {
            connections.remove(email);
            info!("Question socket disconnected for {email}");
        }
    }

    pub fn push(&self, email: &str, payload: &Value) -> Result<(), PushError> {
        let connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        let connection = connections.get(email).ok_or(PushError::NotConnected)?;
        connection
            .tx
            .send(payload.to_string())
            .map_err(|_| PushError::Closed)?;
        debug!("Pushed question to {email}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_push_reaches_registered_connection() {
        let hub = QuestionHub::default();
        let (_, mut rx) = hub.register("kim@example.com");
        hub.push("kim@example.com", &json!({"type": "new_question", "question_number": "2-1"}))
            .unwrap();
        let payload: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(payload["question_number"], "2-1");
    }

    #[test]
    fn test_push_without_connection_fails() {
        let hub = QuestionHub::default();
        assert_eq!(hub.push("nobody@example.com", &json!({})), Err(PushError::NotConnected));
    }

    #[test]
    fn test_stale_unregister_keeps_newer_connection() {
        let hub = QuestionHub::default();
        let (old_id, _old_rx) = hub.register("kim@example.com");
        let (_new_id, _new_rx) = hub.register("kim@example.com");
        hub.unregister("kim@example.com", old_id);
        assert!(hub.push("kim@example.com", &json!({})).is_ok());
    }

    #[test]
    fn test_dropped_receiver_reports_closed() {
        let hub = QuestionHub::default();
        let (_, rx) = hub.register("kim@example.com");
        drop(rx);
        assert_eq!(hub.push("kim@example.com", &json!({})), Err(PushError::Closed));
    }
}
