//! Cognito ID-token verification and the `AuthUser` extractor.

use std::time::{Duration, Instant};

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::state::AppState;

/// The caller, as established by a verified ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub sub: String,
    pub email: String,
    /// Raw bearer token, forwarded to downstream jobs that re-authenticate.
    pub token: String,
}

impl AuthUser {
    pub fn email_prefix(&self) -> &str {
        crate::storage::keys::email_prefix(&self.email)
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
    token_use: Option<String>,
}

/// Unknown key ids refetch the JWKS at most this often.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct KeyCache {
    set: Option<JwkSet>,
    /// Last fetch attempt, successful or not.
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn refresh_due(&self, now: Instant) -> bool {
        self.fetched_at
            .map_or(true, |at| now.saturating_duration_since(at) >= MIN_REFRESH_INTERVAL)
    }
}

/// Verifies RS256 tokens against the user pool's JWKS, fetched lazily and
/// refreshed when an unknown `kid` shows up (key rotation).
pub struct JwtVerifier {
    http: reqwest::Client,
    jwks_url: String,
    issuer: String,
    audience: String,
    keys: RwLock<KeyCache>,
    /// Serializes refreshes so concurrent misses share one fetch.
    refreshing: Mutex<()>,
}

impl JwtVerifier {
    pub fn new(http: reqwest::Client, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        let issuer = issuer.into();
        Self {
            http,
            jwks_url: format!("{issuer}/.well-known/jwks.json"),
            issuer,
            audience: audience.into(),
            keys: RwLock::new(KeyCache::default()),
            refreshing: Mutex::new(()),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<AuthUser, AppError> {
        let header = decode_header(token)
            .map_err(|e| AppError::Unauthorized(format!("malformed token: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| AppError::Unauthorized("token has no key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("token rejected: {e}")))?;

        user_from_claims(data.claims, token)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AppError> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        {
            let _guard = self.refreshing.lock().await;
            if let Some(key) = self.cached_key(kid).await? {
                return Ok(key);
            }
            if self.keys.read().await.refresh_due(Instant::now()) {
                self.refresh().await?;
            } else {
                debug!("JWKS fetched recently; not refetching for kid {kid}");
            }
        }

        self.cached_key(kid)
            .await?
            .ok_or_else(|| AppError::Unauthorized(format!("unknown signing key {kid}")))
    }

    async fn cached_key(&self, kid: &str) -> Result<Option<DecodingKey>, AppError> {
        let keys = self.keys.read().await;
        let Some(jwk) = keys.set.as_ref().and_then(|set| set.find(kid)) else {
            return Ok(None);
        };
        DecodingKey::from_jwk(jwk)
            .map(Some)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("unusable JWK {kid}: {e}")))
    }

    async fn refresh(&self) -> Result<(), AppError> {
        debug!("Fetching JWKS from {}", self.jwks_url);
        self.keys.write().await.fetched_at = Some(Instant::now());
        let set: JwkSet = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWKS fetch failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWKS is not valid JSON: {e}")))?;

        info!("Loaded {} signing keys from the user pool", set.keys.len());
        self.keys.write().await.set = Some(set);
        Ok(())
    }
}

fn user_from_claims(claims: IdTokenClaims, token: &str) -> Result<AuthUser, AppError> {
    if claims.token_use.as_deref() != Some("id") {
        return Err(AppError::Unauthorized("an ID token is required".to_string()));
    }
    let email = claims
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Unauthorized("token carries no email".to_string()))?;
    Ok(AuthUser {
        sub: claims.sub,
        email,
        token: token.to_string(),
    })
}

/// The token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Pulls the bearer token out of request headers.
pub fn bearer_from_headers(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_from_headers(&parts.headers).ok_or_else(|| {
            AppError::Unauthorized("Authorization header missing or malformed".to_string())
        })?;

        state.verifier.verify(token).await.map_err(|e| {
            warn!("Rejected bearer token on {}: {e}", parts.uri.path());
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(token_use: Option<&str>, email: Option<&str>) -> IdTokenClaims {
        IdTokenClaims {
            sub: "abc-123".to_string(),
            email: email.map(String::from),
            token_use: token_use.map(String::from),
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  abc.def "), Some("abc.def"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
    }

    #[test]
    fn test_id_token_yields_user() {
        let user = user_from_claims(claims(Some("id"), Some("kim@example.com")), "tok").unwrap();
        assert_eq!(user.sub, "abc-123");
        assert_eq!(user.email_prefix(), "kim");
        assert_eq!(user.token, "tok");
    }

    #[test]
    fn test_access_token_is_rejected() {
        let err = user_from_claims(claims(Some("access"), Some("kim@example.com")), "tok");
        assert!(matches!(err, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_missing_email_is_rejected() {
        let err = user_from_claims(claims(Some("id"), None), "tok");
        assert!(matches!(err, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_refresh_due_only_after_interval() {
        let now = Instant::now();
        assert!(KeyCache::default().refresh_due(now));

        let cache = KeyCache {
            set: None,
            fetched_at: Some(now),
        };
        assert!(!cache.refresh_due(now + Duration::from_secs(5)));
        assert!(cache.refresh_due(now + MIN_REFRESH_INTERVAL));
    }

    #[tokio::test]
    async fn test_unknown_kids_share_one_fetch() {
        // Nothing listens on the discard port, so a fetch fails fast.
        let verifier = JwtVerifier::new(reqwest::Client::new(), "http://127.0.0.1:9/pool", "client");

        let first = verifier.decoding_key("made-up-1").await;
        assert!(matches!(first, Err(AppError::Internal(_))));

        // Within the interval the second miss is rejected without a fetch.
        let second = verifier.decoding_key("made-up-2").await;
        assert!(matches!(second, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_jwks_url_derives_from_issuer() {
        let verifier = JwtVerifier::new(
            reqwest::Client::new(),
            "https://cognito-idp.ap-northeast-2.amazonaws.com/pool",
            "client",
        );
        assert_eq!(
            verifier.jwks_url,
            "https://cognito-idp.ap-northeast-2.amazonaws.com/pool/.well-known/jwks.json"
        );
    }
}
