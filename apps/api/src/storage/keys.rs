//! Object key conventions. Every object is addressed by the user's email prefix
//! (the part before `@`) plus a sequence or session number.

use url::Url;

/// The part of an email before `@`. Returns the whole string when there is none.
pub fn email_prefix(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

pub fn resume_prefix(prefix: &str) -> String {
    format!("resumes/{prefix}/")
}

pub fn resume_key(prefix: &str, filename: &str) -> String {
    format!("resumes/{prefix}/{filename}")
}

/// Recovers the object key from a stored resume URL (`https://{domain}/{key}`).
pub fn resume_key_from_url<'a>(file_url: &'a str, custom_domain: &str) -> &'a str {
    let marker = format!("{custom_domain}/");
    file_url
        .rsplit_once(marker.as_str())
        .map(|(_, key)| key)
        .unwrap_or(file_url)
}

pub fn user_root(prefix: &str) -> String {
    format!("{prefix}/")
}

pub fn question_text_key(prefix: &str, number: &str) -> String {
    format!("{prefix}/questions{number}.txt")
}

pub fn followup_text_key(prefix: &str, number: &str) -> String {
    format!("{prefix}/{number}.txt")
}

/// Synthesized audio for question `number` (`3`, `2-1`, ...).
pub fn tts_audio_key(prefix: &str, number: &str) -> String {
    format!("{prefix}/questions{number}.wav")
}

pub fn session_audio_prefix(prefix: &str, upload_id: &str) -> String {
    format!("{prefix}/{upload_id}/wavs/")
}

pub fn session_text_prefix(prefix: &str, upload_id: &str) -> String {
    format!("{prefix}/{upload_id}/text/")
}

pub fn session_audio_key(prefix: &str, upload_id: &str, question_id: &str) -> String {
    format!("{prefix}/{upload_id}/wavs/live_q{question_id}.wav")
}

pub fn session_text_key(prefix: &str, upload_id: &str, question_id: &str) -> String {
    format!("{prefix}/{upload_id}/text/live_q{question_id}.txt")
}

pub fn merged_audio_key(prefix: &str, upload_id: &str) -> String {
    format!("{prefix}/{upload_id}/merged/merged_audio.wav")
}

/// Listing prefix for today's sessions: `{prefix}/{MMDD}-`.
pub fn session_day_prefix(prefix: &str, day: &str) -> String {
    format!("{prefix}/{day}-")
}

pub fn full_clip_key(prefix: &str, interview_id: &str, question_id: &str) -> String {
    format!("full_clips/{prefix}/{interview_id}/q{question_id}.webm")
}

pub fn clips_prefix(prefix: &str) -> String {
    format!("clips/{prefix}/")
}

pub fn thumbnails_prefix(prefix: &str) -> String {
    format!("thumbnails/{prefix}/")
}

pub fn clip_key(prefix: &str, interview_id: &str, question_id: &str, segment: usize) -> String {
    format!("clips/{prefix}/{interview_id}_q{question_id}_seg{segment}.mp4")
}

pub fn thumbnail_key(prefix: &str, interview_id: &str, question_id: &str, segment: usize) -> String {
    format!("thumbnails/{prefix}/{interview_id}_q{question_id}_thumb{segment}.jpg")
}

/// Thumbnail belonging to a clip key produced by [`clip_key`].
pub fn thumbnail_for_clip(prefix: &str, clip_key: &str) -> String {
    let stem = file_stem(clip_key);
    match stem.rsplit_once("_seg") {
        Some((head, segment)) => format!("thumbnails/{prefix}/{head}_thumb{segment}.jpg"),
        None => format!("thumbnails/{prefix}/{stem}.jpg"),
    }
}

pub fn report_pdf_key(prefix: &str, video_id: &str) -> String {
    format!("clips/{prefix}/{video_id}_report.pdf")
}

/// Path of a report behind the CDN, which is rooted at the `clips/` folder.
pub fn report_cdn_path(prefix: &str, video_id: &str) -> String {
    format!("/{prefix}/{video_id}_report.pdf")
}

/// Virtual-hosted-style S3 URL with each path segment percent-encoded.
pub fn public_object_url(bucket: &str, region: &str, key: &str) -> String {
    let base = format!("https://{bucket}.s3.{region}.amazonaws.com");
    match Url::parse(&base) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.clear().extend(key.split('/'));
            }
            url.to_string()
        }
        Err(_) => format!("{base}/{key}"),
    }
}

/// File stem of a key: `a/b/questions2-1.txt` -> `questions2-1`.
pub fn file_stem(key: &str) -> &str {
    let name = key.rsplit('/').next().unwrap_or(key);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_prefix() {
        assert_eq!(email_prefix("kim.dev@example.com"), "kim.dev");
        assert_eq!(email_prefix("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_resume_key_from_url() {
        let url = "https://cdn.knok.example/resumes/kim/cv.pdf";
        assert_eq!(
            resume_key_from_url(url, "cdn.knok.example"),
            "resumes/kim/cv.pdf"
        );
    }

    #[test]
    fn test_session_keys() {
        assert_eq!(
            session_audio_key("kim", "0610-1", "3"),
            "kim/0610-1/wavs/live_q3.wav"
        );
        assert_eq!(
            session_text_key("kim", "0610-1", "3"),
            "kim/0610-1/text/live_q3.txt"
        );
        assert_eq!(session_day_prefix("kim", "0610"), "kim/0610-");
    }

    #[test]
    fn test_tts_and_followup_keys_share_number() {
        assert_eq!(followup_text_key("kim", "2-1"), "kim/2-1.txt");
        assert_eq!(tts_audio_key("kim", "2-1"), "kim/questions2-1.wav");
        assert_eq!(question_text_key("kim", "4"), "kim/questions4.txt");
    }

    #[test]
    fn test_thumbnail_for_clip() {
        let clip = clip_key("kim", "0614-2", "3", 1);
        assert_eq!(clip, "clips/kim/0614-2_q3_seg1.mp4");
        assert_eq!(
            thumbnail_for_clip("kim", &clip),
            thumbnail_key("kim", "0614-2", "3", 1)
        );
    }

    #[test]
    fn test_public_url_encodes_segments() {
        let url = public_object_url("tts-bucket", "ap-northeast-2", "kim/질문 1.wav");
        assert!(url.starts_with("https://tts-bucket.s3.ap-northeast-2.amazonaws.com/kim/"));
        assert!(!url.contains(' '));
        assert!(url.contains("%EC%A7%88"));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("kim/questions2-1.txt"), "questions2-1");
        assert_eq!(file_stem("plain"), "plain");
    }
}
