//! Interview recordings: full question clips and the highlighted segments cut from them.

pub mod ffmpeg;
pub mod handlers;
