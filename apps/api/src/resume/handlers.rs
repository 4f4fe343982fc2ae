use axum::{extract::Multipart, extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::multipart::MultipartForm;
use crate::resume::pdf::extract_pdf_text;
use crate::resume::repository::{delete_resume, find_resume, upsert_resume};
use crate::state::AppState;
use crate::storage::keys;

#[derive(Serialize)]
pub struct ResumeResponse {
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ResumeUrlResponse {
    pub file_url: Option<String>,
}

#[derive(Serialize)]
pub struct ResumeTextResponse {
    pub resume_text: String,
}

/// POST /api/resume/upload/
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeResponse>), AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form
        .take_file("resume")
        .ok_or_else(|| AppError::Validation("파일이 없습니다.".to_string()))?;

    let key = keys::resume_key(user.email_prefix(), &file.file_name);
    let content_type = file.content_type.as_deref().unwrap_or("application/pdf");
    state
        .storage
        .put(&state.config.resume_bucket, &key, file.data, content_type)
        .await?;

    let file_url = format!("https://{}/{key}", state.config.s3_custom_domain);
    let row = upsert_resume(&state.db, &user.sub, &user.email, &file_url).await?;
    info!("Stored resume for {} at {file_url}", user.email);

    Ok((
        StatusCode::CREATED,
        Json(ResumeResponse {
            file_url: row.file_url,
            uploaded_at: row.uploaded_at,
        }),
    ))
}

/// DELETE /api/resume/delete/
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, AppError> {
    let resume = find_resume(&state.db, &user.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("업로드된 이력서가 없습니다.".to_string()))?;

    let key = keys::resume_key_from_url(&resume.file_url, &state.config.s3_custom_domain);
    state.storage.delete(&state.config.resume_bucket, key).await?;
    delete_resume(&state.db, &user.sub).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/resume/
pub async fn handle_get_resume(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ResumeUrlResponse>, AppError> {
    let resume = find_resume(&state.db, &user.sub).await?;
    Ok(Json(ResumeUrlResponse {
        file_url: resume.map(|r| r.file_url),
    }))
}

/// GET /api/get-resume-text/
pub async fn handle_get_resume_text(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ResumeTextResponse>, AppError> {
    let resume = find_resume(&state.db, &user.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("등록된 이력서가 없습니다.".to_string()))?;

    let key = keys::resume_key_from_url(&resume.file_url, &state.config.s3_custom_domain);
    let data = state.storage.get(&state.config.resume_bucket, key).await?;
    info!("Downloaded resume {key} ({} bytes)", data.len());

    let resume_text = extract_pdf_text(data).await?;
    Ok(Json(ResumeTextResponse { resume_text }))
}
