//! Prosody metrics over a merged answer recording.
//!
//! - pitch: per-frame autocorrelation F0 over voiced frames (75–500 Hz)
//! - silence: frame RMS more than 30 dB below the loudest frame counts as silence
//! - speech rate: whitespace-separated words per second of audio

use serde::Serialize;

const MIN_F0_HZ: f32 = 75.0;
const MAX_F0_HZ: f32 = 500.0;
/// Peak autocorrelation (relative to lag 0) a frame needs to count as voiced.
const VOICING_THRESHOLD: f32 = 0.3;
const MIN_VOICED_RMS: f32 = 1e-3;

const SILENCE_TOP_DB: f32 = 30.0;
const RMS_FRAME: usize = 2048;
const RMS_HOP: usize = 512;

const TREMOR_STD_HZ: f64 = 20.0;
const CALM_STD_HZ: f64 = 20.0;
const CONFIDENT_STD_HZ: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceMetrics {
    pub pitch_std: f64,
    pub voice_tremor: &'static str,
    pub speech_rate: f64,
    pub silence_ratio: f64,
    pub emotion: &'static str,
}

pub fn analyze(samples: &[f32], sample_rate: u32, transcript: &str) -> VoiceMetrics {
    let pitches = pitch_track(samples, sample_rate);
    let std = std_dev(&pitches);
    let duration = duration_seconds(samples, sample_rate);

    VoiceMetrics {
        pitch_std: round2(std),
        voice_tremor: tremor_label(std),
        speech_rate: speech_rate(transcript, duration),
        silence_ratio: silence_ratio(samples, sample_rate),
        emotion: emotion_label(&pitches),
    }
}

pub fn duration_seconds(samples: &[f32], sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    samples.len() as f64 / f64::from(sample_rate)
}

/// F0 estimates (Hz) for each voiced frame.
pub fn pitch_track(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    if sample_rate == 0 {
        return Vec::new();
    }
    let rate = sample_rate as f32;
    let min_lag = (rate / MAX_F0_HZ).floor().max(1.0) as usize;
    let max_lag = (rate / MIN_F0_HZ).ceil() as usize;
    let frame_len = (2 * max_lag).max(1024);

    samples
        .chunks_exact(frame_len)
        .filter_map(|frame| frame_pitch(frame, min_lag, max_lag, rate))
        .collect()
}

fn frame_pitch(frame: &[f32], min_lag: usize, max_lag: usize, rate: f32) -> Option<f32> {
    let mean = frame.iter().sum::<f32>() / frame.len() as f32;
    let centered: Vec<f32> = frame.iter().map(|s| s - mean).collect();

    let energy: f32 = centered.iter().map(|s| s * s).sum();
    let rms = (energy / centered.len() as f32).sqrt();
    if rms < MIN_VOICED_RMS {
        return None;
    }

    let max_lag = max_lag.min(centered.len() - 1);
    let mut best_lag = 0;
    let mut best_corr = 0.0f32;
    for lag in min_lag..=max_lag {
        let corr: f32 = centered[..centered.len() - lag]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum();
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    (best_lag > 0 && best_corr / energy >= VOICING_THRESHOLD).then(|| rate / best_lag as f32)
}

/// Population standard deviation; 0 for an empty slice.
pub fn std_dev(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / n;
    var.sqrt()
}

pub fn tremor_label(pitch_std: f64) -> &'static str {
    if pitch_std > TREMOR_STD_HZ {
        "감지됨"
    } else {
        "안정적"
    }
}

pub fn emotion_label(pitches: &[f32]) -> &'static str {
    if pitches.is_empty() {
        return "데이터 없음";
    }
    let std = std_dev(pitches);
    if std < CALM_STD_HZ {
        "침착함"
    } else if std < CONFIDENT_STD_HZ {
        "자신감 있음"
    } else {
        "긴장함"
    }
}

pub fn speech_rate(transcript: &str, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    round2(transcript.split_whitespace().count() as f64 / duration)
}

/// Share of the recording that is silence, 0..=1.
pub fn silence_ratio(samples: &[f32], sample_rate: u32) -> f64 {
    let total = duration_seconds(samples, sample_rate);
    if total <= 0.0 {
        return 0.0;
    }

    // Frame i is centred on sample i * RMS_HOP and stands for the hop that follows it.
    let len = samples.len();
    let half = RMS_FRAME / 2;
    let frames: Vec<f32> = (0..(len + RMS_HOP - 1) / RMS_HOP)
        .map(|i| {
            let centre = i * RMS_HOP;
            frame_rms(&samples[centre.saturating_sub(half)..(centre + half).min(len)])
        })
        .collect();

    let loudest = frames.iter().copied().fold(0.0f32, f32::max);
    if loudest <= 0.0 {
        return 1.0;
    }
    let floor = loudest * 10f32.powf(-SILENCE_TOP_DB / 20.0);
    let voiced_samples: usize = frames
        .iter()
        .enumerate()
        .filter(|(_, rms)| **rms > floor)
        .map(|(i, _)| RMS_HOP.min(len - i * RMS_HOP))
        .sum();
    let voiced = voiced_samples as f64 / f64::from(sample_rate);

    round2((1.0 - voiced / total).clamp(0.0, 1.0))
}

fn frame_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn tone(freq: f32, seconds: f32) -> Vec<f32> {
        let n = (seconds * RATE as f32) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin())
            .collect()
    }

    #[test]
    fn test_steady_tone_is_calm_and_stable() {
        let samples = tone(200.0, 1.0);
        let pitches = pitch_track(&samples, RATE);
        assert!(!pitches.is_empty());
        for p in &pitches {
            assert!((p - 200.0).abs() < 3.0, "pitch {p}");
        }

        let metrics = analyze(&samples, RATE, "");
        assert!(metrics.pitch_std < 1.0);
        assert_eq!(metrics.voice_tremor, "안정적");
        assert_eq!(metrics.emotion, "침착함");
        assert_eq!(metrics.silence_ratio, 0.0);
    }

    #[test]
    fn test_pitch_jumps_read_as_tension() {
        let mut samples = tone(150.0, 1.0);
        samples.extend(tone(300.0, 1.0));
        let metrics = analyze(&samples, RATE, "");
        assert!(metrics.pitch_std > 60.0, "std {}", metrics.pitch_std);
        assert_eq!(metrics.voice_tremor, "감지됨");
        assert_eq!(metrics.emotion, "긴장함");
    }

    #[test]
    fn test_silence_has_no_pitch_data() {
        let samples = vec![0.0f32; RATE as usize];
        let metrics = analyze(&samples, RATE, "");
        assert_eq!(metrics.emotion, "데이터 없음");
        assert_eq!(metrics.pitch_std, 0.0);
        assert_eq!(metrics.silence_ratio, 1.0);
    }

    #[test]
    fn test_half_silent_recording() {
        let mut samples = tone(220.0, 1.0);
        samples.extend(vec![0.0f32; RATE as usize]);
        let ratio = silence_ratio(&samples, RATE);
        assert!((ratio - 0.5).abs() < 0.1, "ratio {ratio}");
    }

    #[test]
    fn test_speech_rate() {
        assert_eq!(speech_rate("하나 둘 셋 넷 다섯 여섯 일곱 여덟 아홉 열", 5.0), 2.0);
        assert_eq!(speech_rate("말", 0.0), 0.0);
        assert_eq!(speech_rate("one two three", 7.0), 0.43);
    }

    #[test]
    fn test_emotion_thresholds() {
        assert_eq!(emotion_label(&[100.0, 100.0]), "침착함");
        // std of [100, 160] is 30
        assert_eq!(emotion_label(&[100.0, 160.0]), "자신감 있음");
        // std of [100, 300] is 100
        assert_eq!(emotion_label(&[100.0, 300.0]), "긴장함");
    }

    #[test]
    fn test_empty_input() {
        let metrics = analyze(&[], RATE, "말");
        assert_eq!(metrics.speech_rate, 0.0);
        assert_eq!(metrics.silence_ratio, 0.0);
        assert_eq!(metrics.emotion, "데이터 없음");
    }
}
