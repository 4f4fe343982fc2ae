//! The audio/transcript relay at the heart of `/ws/transcribe`.
//!
//! Inbound binary frames are buffered and forwarded to the transcriber while
//! final segments flow back to the client as `{"transcript": text}`. Input
//! stops on an `END` frame, a close frame, a broken socket, or
//! [`IDLE_TIMEOUT`] without audio. Segments still in flight are then drained
//! for up to [`DRAIN_TIMEOUT`].

use std::time::Duration;

use axum::extract::ws::Message;
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(90);
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
pub const END_MARKER: &[u8] = b"END";

#[derive(Debug, Default, PartialEq)]
pub struct RelayOutcome {
    /// Raw 16-bit PCM exactly as received.
    pub audio: Vec<u8>,
    /// Final segments, one per line.
    pub transcript: String,
}

pub async fn relay<S, K>(
    inbound: &mut S,
    outbound: &mut K,
    audio_tx: mpsc::Sender<Bytes>,
    mut segments: mpsc::Receiver<String>,
) -> RelayOutcome
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    K: Sink<Message> + Unpin,
{
    let mut outcome = RelayOutcome::default();
    let mut audio_tx = Some(audio_tx);
    let mut segments_open = true;

    let idle = sleep_until(Instant::now() + IDLE_TIMEOUT);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            _ = &mut idle => {
                info!("No audio for {}s; ending input", IDLE_TIMEOUT.as_secs());
                break;
            }
            frame = inbound.next() => match frame {
                Some(Ok(Message::Binary(data))) => {
                    if data == END_MARKER {
                        info!("Client sent END");
                        break;
                    }
                    idle.as_mut().reset(Instant::now() + IDLE_TIMEOUT);
                    outcome.audio.extend_from_slice(&data);
                    if let Some(tx) = &audio_tx {
                        if tx.send(Bytes::from(data)).await.is_err() {
                            warn!("Transcriber stopped accepting audio; buffering only");
                            audio_tx = None;
                        }
                    }
                }
                Some(Ok(Message::Text(text))) => debug!("Ignoring text frame: {text}"),
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client closed the audio stream");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Websocket receive failed: {e}");
                    break;
                }
            },
            segment = segments.recv(), if segments_open => match segment {
                Some(text) => forward_segment(outbound, &mut outcome.transcript, text).await,
                None => segments_open = false,
            },
        }
    }

    // Closing the audio channel ends the transcription stream.
    drop(audio_tx);

    if segments_open {
        let drain = async {
            while let Some(text) = segments.recv().await {
                forward_segment(outbound, &mut outcome.transcript, text).await;
            }
        };
        if timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("Transcriber did not finish within {}s", DRAIN_TIMEOUT.as_secs());
        }
    }

    outcome
}

async fn forward_segment<K>(outbound: &mut K, transcript: &mut String, text: String)
where
    K: Sink<Message> + Unpin,
{
    transcript.push_str(&text);
    transcript.push('\n');
    let payload = json!({ "transcript": text }).to_string();
    if outbound.send(Message::Text(payload)).await.is_err() {
        debug!("Client gone; transcript segment kept server-side only");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::Transcriber;
    use async_trait::async_trait;
    use futures::channel::mpsc as fmpsc;

    use crate::errors::AppError;

    /// Emits one segment per audio chunk describing its size.
    struct EchoTranscriber;

    #[async_trait]
    impl Transcriber for EchoTranscriber {
        async fn start(
            &self,
            mut audio: mpsc::Receiver<Bytes>,
        ) -> Result<mpsc::Receiver<String>, AppError> {
            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(async move {
                while let Some(chunk) = audio.recv().await {
                    if tx.send(format!("{} bytes", chunk.len())).await.is_err() {
                        break;
                    }
                }
            });
            Ok(rx)
        }
    }

    async fn run(frames: Vec<Message>) -> (RelayOutcome, Vec<Message>) {
        let mut inbound = futures::stream::iter(frames.into_iter().map(Ok::<_, axum::Error>));
        let (mut outbound, sent) = fmpsc::unbounded::<Message>();
        let (audio_tx, audio_rx) = mpsc::channel(16);
        let segments = EchoTranscriber.start(audio_rx).await.unwrap();

        let outcome = relay(&mut inbound, &mut outbound, audio_tx, segments).await;
        drop(outbound);
        (outcome, sent.collect().await)
    }

    #[tokio::test]
    async fn test_end_marker_stops_input_and_drains_segments() {
        let (outcome, sent) = run(vec![
            Message::Binary(vec![1; 4]),
            Message::Binary(vec![2; 6]),
            Message::Binary(b"END".to_vec()),
            Message::Binary(vec![3; 8]),
        ])
        .await;

        assert_eq!(outcome.audio, [vec![1u8; 4], vec![2u8; 6]].concat());
        assert_eq!(outcome.transcript, "4 bytes\n6 bytes\n");
        let texts: Vec<String> = sent
            .into_iter()
            .filter_map(|m| match m {
                Message::Text(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![r#"{"transcript":"4 bytes"}"#, r#"{"transcript":"6 bytes"}"#]
        );
    }

    #[tokio::test]
    async fn test_close_frame_ends_session() {
        let (outcome, _) = run(vec![
            Message::Binary(vec![0; 2]),
            Message::Text("ping".into()),
            Message::Close(None),
        ])
        .await;
        assert_eq!(outcome.audio.len(), 2);
        assert_eq!(outcome.transcript, "2 bytes\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_client_times_out() {
        let mut inbound = futures::stream::pending::<Result<Message, axum::Error>>();
        let (mut outbound, _sent) = fmpsc::unbounded::<Message>();
        let (audio_tx, audio_rx) = mpsc::channel(16);
        let segments = EchoTranscriber.start(audio_rx).await.unwrap();

        let started = Instant::now();
        let outcome = relay(&mut inbound, &mut outbound, audio_tx, segments).await;
        assert!(started.elapsed() >= IDLE_TIMEOUT);
        assert_eq!(outcome, RelayOutcome::default());
    }
}
