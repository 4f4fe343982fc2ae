//! WAV decode, merge and encode helpers.

use std::io::Cursor;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Sample rate of the live answer stream (16-bit mono PCM).
pub const LIVE_SAMPLE_RATE: u32 = 16_000;

/// Decodes WAV bytes to mono f32 samples in [-1, 1].
pub fn decode_wav(wav_bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::new(Cursor::new(wav_bytes)).context("Failed to parse WAV")?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let bits = u32::from(spec.bits_per_sample.max(1));
            let max_val = if bits > 1 {
                ((1i64 << (bits - 1)) - 1) as f32
            } else {
                1.0
            };
            reader
                .samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| (s as f32 / max_val).clamp(-1.0, 1.0))
                .collect()
        }
        hound::SampleFormat::Float => reader.samples::<f32>().filter_map(|s| s.ok()).collect(),
    };

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        samples
    };

    let mono = mono
        .into_iter()
        .map(|s| if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 })
        .collect();

    Ok((mono, spec.sample_rate))
}

/// Decodes and concatenates WAV files in order. All inputs must share a sample rate.
pub fn concat_wavs<B: AsRef<[u8]>>(files: &[B]) -> Result<(Vec<f32>, u32)> {
    let mut merged = Vec::new();
    let mut rate: Option<u32> = None;

    for (idx, file) in files.iter().enumerate() {
        let (samples, file_rate) =
            decode_wav(file.as_ref()).with_context(|| format!("decoding audio #{idx}"))?;
        match rate {
            None => rate = Some(file_rate),
            Some(r) if r != file_rate => {
                bail!("audio #{idx} is {file_rate} Hz but earlier parts are {r} Hz")
            }
            Some(_) => {}
        }
        merged.extend(samples);
    }

    let rate = rate.context("no audio to merge")?;
    debug!("Merged {} files into {} samples @ {rate} Hz", files.len(), merged.len());
    Ok((merged, rate))
}

/// Encodes mono f32 samples as 16-bit PCM WAV.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Wraps raw little-endian 16-bit mono PCM in a WAV container.
/// A trailing odd byte is dropped.
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for pair in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, seconds: f32, rate: u32) -> Vec<f32> {
        let n = (seconds * rate as f32) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_encode_then_decode_preserves_length_and_rate() {
        let samples = tone(220.0, 0.25, 16_000);
        let wav = encode_wav(&samples, 16_000).unwrap();
        let (decoded, rate) = decode_wav(&wav).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(decoded.len(), samples.len());
        assert!((decoded[100] - samples[100]).abs() < 1e-3);
    }

    #[test]
    fn test_concat_appends_in_order() {
        let a = encode_wav(&vec![0.25; 100], 16_000).unwrap();
        let b = encode_wav(&vec![-0.25; 50], 16_000).unwrap();
        let (merged, rate) = concat_wavs(&[a, b]).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(merged.len(), 150);
        assert!(merged[99] > 0.2);
        assert!(merged[100] < -0.2);
    }

    #[test]
    fn test_concat_rejects_mixed_rates() {
        let a = encode_wav(&[0.1; 10], 16_000).unwrap();
        let b = encode_wav(&[0.1; 10], 22_050).unwrap();
        assert!(concat_wavs(&[a, b]).is_err());
    }

    #[test]
    fn test_pcm16_to_wav_header_and_samples() {
        let pcm: Vec<u8> = [1000i16, -1000, 0].iter().flat_map(|s| s.to_le_bytes()).collect();
        let wav = pcm16_to_wav(&pcm, LIVE_SAMPLE_RATE).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(wav.len(), 44 + pcm.len());

        let reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1000, -1000, 0]);
    }

    #[test]
    fn test_stereo_is_downmixed() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..10 {
                writer.write_sample(i16::MAX).unwrap();
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        let (samples, rate) = decode_wav(&cursor.into_inner()).unwrap();
        assert_eq!(rate, 8_000);
        assert_eq!(samples.len(), 10);
        assert!((samples[0] - 0.5).abs() < 1e-3);
    }
}
