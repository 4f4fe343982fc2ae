use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::jwt::bearer_token;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub id_token: String,
    pub access_token: String,
}

/// POST /api/signup/
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<Value>, AppError> {
    state.identity.sign_up(&req.email, &req.password).await?;
    Ok(Json(json!({ "message": "회원가입 성공! 이메일 인증 필요" })))
}

/// POST /api/confirm-email/
pub async fn handle_confirm_email(
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<Value>, AppError> {
    state.identity.confirm_sign_up(&req.email, &req.code).await?;
    Ok(Json(json!({ "message": "이메일 인증 완료" })))
}

/// POST /api/login/
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<LoginResponse>, AppError> {
    let tokens = state.identity.login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse {
        message: "로그인되었습니다",
        id_token: tokens.id_token,
        access_token: tokens.access_token,
    }))
}

/// POST /api/logout/
/// Takes the access token from the Authorization header; no ID-token check.
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let raw = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("Authorization 헤더가 없습니다.".to_string()))?;
    let token = bearer_token(raw).unwrap_or(raw.trim());

    state.identity.global_sign_out(token).await?;
    Ok(Json(json!({ "message": "로그아웃 되었습니다." })))
}
