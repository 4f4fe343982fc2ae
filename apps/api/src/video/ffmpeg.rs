//! ffmpeg invocations for interview recordings. Each runs as a child process
//! with stdout discarded and stderr captured for the error message.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

const FFMPEG: &str = "ffmpeg";

/// A span of the source recording, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.end > self.start
    }

    pub fn midpoint(&self) -> f64 {
        self.start + (self.end - self.start) / 2.0
    }
}

fn flags(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

/// Browser webm to a seekable 30 fps H.264/AAC mp4.
pub fn transcode_args(input: &Path, output: &Path) -> Vec<OsString> {
    let mut args = flags(&["-y", "-fflags", "+genpts", "-i"]);
    args.push(input.into());
    args.extend(flags(&[
        "-vf", "fps=30",
        "-c:v", "libx264", "-preset", "fast", "-crf", "23",
        "-c:a", "aac",
        "-movflags", "+faststart",
        "-avoid_negative_ts", "make_zero",
    ]));
    args.push(output.into());
    args
}

pub fn cut_args(input: &Path, segment: Segment, output: &Path) -> Vec<OsString> {
    let mut args = flags(&["-y", "-i"]);
    args.push(input.into());
    args.push("-ss".into());
    args.push(format!("{:.3}", segment.start).into());
    args.push("-to".into());
    args.push(format!("{:.3}", segment.end).into());
    args.extend(flags(&["-c:v", "libx264", "-c:a", "aac", "-movflags", "+faststart"]));
    args.push(output.into());
    args
}

pub fn thumbnail_args(input: &Path, at_seconds: f64, output: &Path) -> Vec<OsString> {
    let mut args = flags(&["-y", "-ss"]);
    args.push(format!("{at_seconds:.3}").into());
    args.push("-i".into());
    args.push(input.into());
    args.extend(flags(&["-frames:v", "1", "-q:v", "2"]));
    args.push(output.into());
    args
}

async fn run_ffmpeg(args: Vec<OsString>) -> Result<()> {
    debug!("Running {FFMPEG} {args:?}");
    let output = tokio::process::Command::new(FFMPEG)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to spawn {FFMPEG}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        bail!(
            "{FFMPEG} exited with {}: {}",
            output.status,
            tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
        );
    }
    Ok(())
}

pub async fn transcode_to_mp4(input: &Path, output: &Path) -> Result<()> {
    run_ffmpeg(transcode_args(input, output)).await
}

pub async fn cut_clip(input: &Path, segment: Segment, output: &Path) -> Result<()> {
    run_ffmpeg(cut_args(input, segment, output)).await
}

pub async fn extract_thumbnail(input: &Path, at_seconds: f64, output: &Path) -> Result<()> {
    run_ffmpeg(thumbnail_args(input, at_seconds, output)).await
}
