//! Live answer transcription over websockets, and server-pushed questions.

pub mod aws;
pub mod handlers;
pub mod hub;
pub mod refine;
pub mod relay;
pub mod session;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::errors::AppError;

pub use aws::AwsTranscriber;
pub use hub::QuestionHub;
pub use session::UploadSessions;

// ─────────────────────────────────────────────────────────────────────────────
// Transcriber trait
// ─────────────────────────────────────────────────────────────────────────────

/// A streaming speech-to-text backend.
///
/// Audio chunks go in through `audio`; closing the sender ends the stream.
/// Final (non-partial) segments come out of the returned receiver, which
/// closes once the backend has flushed its last result.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn start(&self, audio: mpsc::Receiver<Bytes>) -> Result<mpsc::Receiver<String>, AppError>;
}
