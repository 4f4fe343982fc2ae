//! Thin wrapper over the Cognito user-pool API used by the auth endpoints.

use aws_sdk_cognitoidentityprovider::error::DisplayErrorContext;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{error, info};

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

/// `base64(HMAC-SHA256(client_secret, username + client_id))`, required on every
/// call when the app client has a secret.
pub fn secret_hash(username: &str, client_id: &str, client_secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

#[derive(Debug)]
pub struct LoginTokens {
    pub id_token: String,
    pub access_token: String,
}

#[derive(Clone)]
pub struct IdentityClient {
    client: aws_sdk_cognitoidentityprovider::Client,
    client_id: String,
    client_secret: String,
}

impl IdentityClient {
    pub fn new(
        client: aws_sdk_cognitoidentityprovider::Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn hash(&self, username: &str) -> String {
        secret_hash(username, &self.client_id, &self.client_secret)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), AppError> {
        let email_attribute = AttributeType::builder()
            .name("email")
            .value(email)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        self.client
            .sign_up()
            .client_id(&self.client_id)
            .secret_hash(self.hash(email))
            .username(email)
            .password(password)
            .user_attributes(email_attribute)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_username_exists_exception())
                    == Some(true)
                {
                    AppError::Validation("이미 존재하는 사용자입니다.".to_string())
                } else {
                    error!("Cognito sign-up failed: {}", DisplayErrorContext(&e));
                    AppError::Validation(format!("회원가입 실패: {}", service_message(&e)))
                }
            })?;

        info!("Signed up {email}; awaiting email confirmation");
        Ok(())
    }

    pub async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), AppError> {
        self.client
            .confirm_sign_up()
            .client_id(&self.client_id)
            .secret_hash(self.hash(email))
            .username(email)
            .confirmation_code(code)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_code_mismatch_exception() => {
                    AppError::Validation("인증 코드가 틀렸습니다.".to_string())
                }
                Some(se) if se.is_expired_code_exception() => {
                    AppError::Validation("인증 코드가 만료되었습니다.".to_string())
                }
                _ => {
                    error!("Cognito confirmation failed: {}", DisplayErrorContext(&e));
                    AppError::Validation(format!("이메일 인증 실패: {}", service_message(&e)))
                }
            })?;

        info!("Confirmed sign-up for {email}");
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginTokens, AppError> {
        let output = self
            .client
            .initiate_auth()
            .client_id(&self.client_id)
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password)
            .auth_parameters("SECRET_HASH", self.hash(email))
            .send()
            .await
            .map_err(|e| {
                error!("Cognito login failed: {}", DisplayErrorContext(&e));
                match e.as_service_error() {
                    Some(se) if se.is_not_authorized_exception() => {
                        AppError::Validation("아이디 또는 비밀번호 오류".to_string())
                    }
                    Some(se) if se.is_user_not_confirmed_exception() => {
                        AppError::Forbidden("이메일 인증이 필요합니다.".to_string())
                    }
                    Some(se) if se.is_invalid_parameter_exception() => {
                        AppError::Validation("파라미터 오류. 설정 확인 필요.".to_string())
                    }
                    _ => AppError::Validation(format!("로그인 실패: {}", service_message(&e))),
                }
            })?;

        let result = output
            .authentication_result()
            .ok_or_else(|| AppError::Unauthorized("추가 인증 단계가 필요합니다.".to_string()))?;

        match (result.id_token(), result.access_token()) {
            (Some(id), Some(access)) => Ok(LoginTokens {
                id_token: id.to_string(),
                access_token: access.to_string(),
            }),
            _ => Err(AppError::Unauthorized(
                "토큰이 발급되지 않았습니다.".to_string(),
            )),
        }
    }

    pub async fn global_sign_out(&self, access_token: &str) -> Result<(), AppError> {
        self.client
            .global_sign_out()
            .access_token(access_token)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_not_authorized_exception())
                    == Some(true)
                {
                    AppError::Unauthorized("유효하지 않은 토큰입니다.".to_string())
                } else {
                    AppError::Validation(format!("로그아웃 실패: {}", service_message(&e)))
                }
            })?;
        Ok(())
    }
}

fn service_message<E, R>(err: &aws_sdk_cognitoidentityprovider::error::SdkError<E, R>) -> String
where
    E: aws_sdk_cognitoidentityprovider::error::ProvideErrorMetadata,
{
    err.as_service_error()
        .and_then(|se| se.message())
        .unwrap_or("identity provider error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_hash_known_vector() {
        // Independently computed: base64(HMAC-SHA256("secret", "user@example.comclient"))
        let hash = secret_hash("user@example.com", "client", "secret");
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"user@example.comclient");
        let expected =
            base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
        assert_eq!(hash, expected);
        assert_eq!(hash.len(), 44);
    }

    #[test]
    fn test_secret_hash_depends_on_username() {
        assert_ne!(
            secret_hash("a@example.com", "client", "secret"),
            secret_hash("b@example.com", "client", "secret")
        );
    }
}
