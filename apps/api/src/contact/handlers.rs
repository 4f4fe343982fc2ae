use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

fn or_placeholder<'a>(value: &'a Option<String>, placeholder: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(placeholder)
}

/// Slack mrkdwn body for one inquiry.
pub fn slack_text(req: &ContactRequest) -> String {
    format!(
        "📩 *새 문의가 도착했습니다!*\n\n👤 이름: {}\n📧 이메일: {}\n📝 내용: {}",
        or_placeholder(&req.name, "이름 없음"),
        or_placeholder(&req.email, "이메일 없음"),
        or_placeholder(&req.message, "내용 없음"),
    )
}

/// POST /api/contact/
///
/// Failures keep the `{success, error}` shape the contact page expects
/// rather than the usual error envelope.
pub async fn handle_contact(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> impl IntoResponse {
    match post_to_slack(&state, &slack_text(&req)).await {
        Ok(()) => {
            info!("Contact inquiry forwarded to Slack");
            (StatusCode::OK, Json(json!({"success": true})))
        }
        Err(e) => {
            error!("Contact inquiry failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": e})),
            )
        }
    }
}

async fn post_to_slack(state: &AppState, text: &str) -> Result<(), String> {
    let webhook = state
        .config
        .slack_webhook_url
        .as_deref()
        .ok_or_else(|| "Slack webhook is not configured".to_string())?;

    state
        .http
        .post(webhook)
        .json(&json!({ "text": text }))
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| format!("Slack request failed: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_text_includes_fields() {
        let req = ContactRequest {
            name: Some("김철수".into()),
            email: Some("kim@example.com".into()),
            message: Some("결제 문의드립니다.".into()),
        };
        let text = slack_text(&req);
        assert!(text.starts_with("📩 *새 문의가 도착했습니다!*\n\n"));
        assert!(text.contains("👤 이름: 김철수"));
        assert!(text.contains("📧 이메일: kim@example.com"));
        assert!(text.ends_with("📝 내용: 결제 문의드립니다."));
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let req = ContactRequest {
            name: Some("  ".into()),
            ..Default::default()
        };
        let text = slack_text(&req);
        assert!(text.contains("이름: 이름 없음"));
        assert!(text.contains("이메일: 이메일 없음"));
        assert!(text.contains("내용: 내용 없음"));
    }
}
