//! Question numbers: `3` for a base question, `3-2` for its second follow-up.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

/// Strips a leading `questions`/`question` from a file stem: `questions2-1` -> `2-1`.
pub fn number_from_stem(stem: &str) -> &str {
    stem.strip_prefix("questions")
        .or_else(|| stem.strip_prefix("question"))
        .unwrap_or(stem)
}

/// A question number sent as either a JSON number or a non-blank string.
pub fn number_from_value(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart<'a> {
    Num(u64),
    Text(&'a str),
}

fn key_parts(number: &str) -> Vec<KeyPart<'_>> {
    number
        .split('-')
        .map(|p| match p.parse::<u64>() {
            Ok(n) if p.bytes().all(|b| b.is_ascii_digit()) => KeyPart::Num(n),
            _ => KeyPart::Text(p),
        })
        .collect()
}

/// Orders by dash-separated components; numeric parts sort before text parts.
pub fn compare_numbers(a: &str, b: &str) -> Ordering {
    key_parts(a).cmp(&key_parts(b))
}

/// `{base}-{k+1}` where `k` is the largest follow-up index already used for `base`.
pub fn next_followup_number(base: &str, existing: &[String]) -> String {
    let prefix = format!("{base}-");
    let next = existing
        .iter()
        .filter_map(|n| n.strip_prefix(&prefix))
        .filter_map(|suffix| suffix.split('-').next()?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    format!("{base}-{next}")
}

/// One voiced question as the interview player consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAudio {
    pub id: String,
    pub audio_url: String,
    pub order: f64,
    pub parent_id: Option<String>,
}

/// Parses an audio stem (`questions3`, `questions3-1`, `3-1`) into `(major, minor)`.
/// Anything that is not `N` or `N-M` yields `None`.
pub fn parse_audio_number(stem: &str) -> Option<(u32, u32)> {
    let number = number_from_stem(stem);
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    match number.split_once('-') {
        Some((major, minor)) if digits(major) && digits(minor) => {
            Some((major.parse().ok()?, minor.parse().ok()?))
        }
        None if digits(number) => Some((number.parse().ok()?, 0)),
        _ => None,
    }
}

impl QuestionAudio {
    pub fn new(major: u32, minor: u32, audio_url: String) -> Self {
        let (id, parent_id) = if minor == 0 {
            (format!("q{major}"), None)
        } else {
            (format!("q{major}_{minor}"), Some(format!("q{major}")))
        };
        Self {
            id,
            audio_url,
            order: f64::from(major) + f64::from(minor) * 0.01,
            parent_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_from_value_accepts_numbers_and_strings() {
        use serde_json::json;
        assert_eq!(number_from_value(Some(json!(2))), Some("2".to_string()));
        assert_eq!(number_from_value(Some(json!(" 2-1 "))), Some("2-1".to_string()));
        assert_eq!(number_from_value(Some(json!(""))), None);
        assert_eq!(number_from_value(Some(json!(null))), None);
        assert_eq!(number_from_value(None), None);
    }

    #[test]
    fn test_number_from_stem() {
        assert_eq!(number_from_stem("questions2-1"), "2-1");
        assert_eq!(number_from_stem("question4"), "4");
        assert_eq!(number_from_stem("3-2"), "3-2");
    }

    #[test]
    fn test_ordering_is_numeric_per_component() {
        let mut numbers = vec!["10", "2-1", "2", "1", "2-10", "2-2", "intro"];
        numbers.sort_by(|a, b| compare_numbers(a, b));
        assert_eq!(numbers, vec!["1", "2", "2-1", "2-2", "2-10", "10", "intro"]);
    }

    #[test]
    fn test_next_followup_number() {
        let existing: Vec<String> = ["1", "2", "2-1", "2-3", "3-5"].iter().map(|s| s.to_string()).collect();
        assert_eq!(next_followup_number("2", &existing), "2-4");
        assert_eq!(next_followup_number("4", &existing), "4-1");
        assert_eq!(next_followup_number("1", &[]), "1-1");
    }

    #[test]
    fn test_next_followup_ignores_other_bases_with_shared_prefix() {
        let existing = vec!["12-4".to_string()];
        assert_eq!(next_followup_number("1", &existing), "1-1");
    }

    #[test]
    fn test_parse_audio_number() {
        assert_eq!(parse_audio_number("questions3"), Some((3, 0)));
        assert_eq!(parse_audio_number("questions3-2"), Some((3, 2)));
        assert_eq!(parse_audio_number("4-1"), Some((4, 1)));
        assert_eq!(parse_audio_number("merged_audio"), None);
        assert_eq!(parse_audio_number("questions3-"), None);
    }

    #[test]
    fn test_question_audio_ids_and_order() {
        let base = QuestionAudio::new(2, 0, "u".into());
        assert_eq!(base.id, "q2");
        assert_eq!(base.parent_id, None);

        let followup = QuestionAudio::new(2, 1, "u".into());
        assert_eq!(followup.id, "q2_1");
        assert_eq!(followup.parent_id.as_deref(), Some("q2"));
        assert!((followup.order - 2.01).abs() < 1e-9);
    }
}
