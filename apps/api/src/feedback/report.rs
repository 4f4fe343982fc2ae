//! Structured interview report: parsing the model's plain-text sections,
//! weighted scoring and the interviewer emoji.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

pub const SUMMARY_SECTION: &str = "요약";

/// Criteria in report order with their weight in the total score.
pub const CRITERIA: [(&str, f64); 6] = [
    ("일관성", 0.20),
    ("논리성", 0.20),
    ("대처능력", 0.15),
    ("구체성", 0.15),
    ("말하기방식", 0.15),
    ("면접태도", 0.15),
];

/// Criteria are scored 0-5; the weighted sum is scaled to 0-100.
const SCORE_SCALE: f64 = 20.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriterionFeedback {
    pub comment: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackReport {
    pub summary: String,
    /// Indexed like [`CRITERIA`].
    pub criteria: Vec<CriterionFeedback>,
}

impl FeedbackReport {
    pub fn chart(&self) -> Vec<u32> {
        self.criteria.iter().map(|c| c.score).collect()
    }

    /// `{summary, detail: {criterion: comment}, chart: {criterion: score}}` in criteria order.
    pub fn to_json(&self) -> Value {
        let mut detail = Map::new();
        let mut chart = Map::new();
        for ((name, _), feedback) in CRITERIA.iter().zip(&self.criteria) {
            detail.insert(name.to_string(), Value::from(feedback.comment.clone()));
            chart.insert(name.to_string(), Value::from(feedback.score));
        }
        json!({
            "summary": self.summary,
            "detail": detail,
            "chart": chart,
        })
    }
}

/// Weighted total on a 0-100 scale, rounded to one decimal.
pub fn calculate_score(chart: &[u32]) -> f64 {
    let total: f64 = CRITERIA
        .iter()
        .zip(chart)
        .map(|((_, weight), score)| f64::from(*score) * weight * SCORE_SCALE)
        .sum();
    (total * 10.0).round() / 10.0
}

pub fn interviewer_emoji(score: f64) -> &'static str {
    if score >= 80.0 {
        "🙂"
    } else if score >= 60.0 {
        "😐"
    } else {
        "😟"
    }
}

/// Criteria whose `=== name ===` header is absent from the text.
pub fn validate_feedback_format(text: &str) -> Vec<&'static str> {
    CRITERIA
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !text.contains(&format!("=== {name} ===")))
        .collect()
}

fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"점수[^\d]*(\d+)").expect("score pattern is valid"))
}

fn section_header(line: &str) -> Option<&str> {
    line.strip_prefix("=== ")
        .and_then(|rest| rest.strip_suffix(" ==="))
        .map(str::trim)
}

/// Parses the sectioned plain-text report. Unknown sections are ignored;
/// missing criteria get an empty comment and a score of 0.
pub fn parse_plain_feedback(text: &str) -> FeedbackReport {
    let mut report = FeedbackReport {
        summary: String::new(),
        criteria: vec![CriterionFeedback::default(); CRITERIA.len()],
    };

    let mut section: Option<&str> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim) {
        if let Some(name) = section_header(line) {
            if let Some(current) = section {
                save_section(&mut report, current, &buffer);
            }
            section = Some(name);
            buffer.clear();
        } else {
            buffer.push(line);
        }
    }
    if let Some(current) = section {
        save_section(&mut report, current, &buffer);
    }

    report
}

fn save_section(report: &mut FeedbackReport, section: &str, lines: &[&str]) {
    let content = lines.join("\n");
    let content = content.trim();

    if section == SUMMARY_SECTION {
        report.summary = content.to_string();
        return;
    }
    let Some(index) = CRITERIA.iter().position(|(name, _)| *name == section) else {
        return;
    };

    let (score_lines, comment_lines): (Vec<&str>, Vec<&str>) =
        content.lines().partition(|l| l.starts_with("(점수"));

    let comment = comment_lines
        .join("\n")
        .trim_start_matches(|c| c == '-' || c == ' ')
        .trim()
        .to_string();
    let score = score_lines
        .first()
        .and_then(|l| score_pattern().captures(l))
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);

    report.criteria[index] = CriterionFeedback { comment, score };
}
