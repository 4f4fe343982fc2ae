use async_trait::async_trait;
use aws_sdk_transcribestreaming::error::DisplayErrorContext;
use aws_sdk_transcribestreaming::primitives::Blob;
use aws_sdk_transcribestreaming::types::error::AudioStreamError;
use aws_sdk_transcribestreaming::types::{
    AudioEvent, AudioStream, LanguageCode, MediaEncoding, TranscriptEvent, TranscriptResultStream,
};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::transcribe::Transcriber;
use crate::voice::wav::LIVE_SAMPLE_RATE;

const SEGMENT_BUFFER: usize = 64;

/// Korean PCM transcription through Amazon Transcribe streaming.
pub struct AwsTranscriber {
    client: aws_sdk_transcribestreaming::Client,
}

impl AwsTranscriber {
    pub fn new(client: aws_sdk_transcribestreaming::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transcriber for AwsTranscriber {
    async fn start(&self, audio: mpsc::Receiver<Bytes>) -> Result<mpsc::Receiver<String>, AppError> {
        let input = ReceiverStream::new(audio).map(|chunk| {
            Ok::<_, AudioStreamError>(AudioStream::AudioEvent(
                AudioEvent::builder().audio_chunk(Blob::new(chunk)).build(),
            ))
        });

        let mut output = self
            .client
            .start_stream_transcription()
            .language_code(LanguageCode::KoKr)
            .media_sample_rate_hertz(LIVE_SAMPLE_RATE as i32)
            .media_encoding(MediaEncoding::Pcm)
            .audio_stream(input.into())
            .send()
            .await
            .map_err(|e| {
                AppError::Transcription(format!(
                    "start_stream_transcription failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        info!("Transcription stream started");

        let (segments_tx, segments_rx) = mpsc::channel(SEGMENT_BUFFER);
        tokio::spawn(async move {
            loop {
                match output.transcript_result_stream.recv().await {
                    Ok(Some(TranscriptResultStream::TranscriptEvent(event))) => {
                        for text in final_segments(&event) {
                            if segments_tx.send(text).await.is_err() {
                                debug!("Segment receiver dropped; stopping transcript reader");
                                return;
                            }
                        }
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Transcript stream failed: {}", DisplayErrorContext(&e));
                        break;
                    }
                }
            }
            info!("Transcription stream closed");
        });

        Ok(segments_rx)
    }
}

/// Non-blank text of every final result in the event.
fn final_segments(event: &TranscriptEvent) -> Vec<String> {
    let Some(transcript) = event.transcript() else {
        return Vec::new();
    };
    transcript
        .results()
        .iter()
        .filter(|r| !r.is_partial())
        .filter_map(|r| r.alternatives().first())
        .filter_map(|alt| alt.transcript())
        .filter(|text| !text.trim().is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_transcribestreaming::types::{Alternative, Result as TranscriptResult, Transcript};

    fn result(text: &str, partial: bool) -> TranscriptResult {
        TranscriptResult::builder()
            .is_partial(partial)
            .alternatives(Alternative::builder().transcript(text).build())
            .build()
    }

    #[test]
    fn test_final_segments_skip_partials_and_blanks() {
        let event = TranscriptEvent::builder()
            .transcript(
                Transcript::builder()
                    .results(result("안녕하", true))
                    .results(result("안녕하세요", false))
                    .results(result("  ", false))
                    .build(),
            )
            .build();
        assert_eq!(final_segments(&event), vec!["안녕하세요"]);
    }

    #[test]
    fn test_event_without_transcript_is_empty() {
        let event = TranscriptEvent::builder().build();
        assert!(final_segments(&event).is_empty());
    }
}
