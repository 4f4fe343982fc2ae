//! CloudFront canned-policy signed URLs for feedback report downloads.
//!
//! The RSA signing key lives in Secrets Manager as a JSON secret with a
//! `private_key.pem` field. It is fetched on first use and kept for the
//! lifetime of the process.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha1::Sha1;
use tokio::sync::OnceCell;
use tracing::info;

/// Reports stay downloadable for 30 days.
pub const REPORT_URL_TTL_HOURS: i64 = 24 * 30;

/// Signs URLs with an already-loaded key.
pub struct CloudFrontSigner {
    key_pair_id: String,
    signing_key: SigningKey<Sha1>,
}

impl CloudFrontSigner {
    pub fn new(key_pair_id: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            key_pair_id: key_pair_id.into(),
            signing_key: SigningKey::<Sha1>::new(private_key),
        }
    }

    /// Parses a PKCS#1 (or PKCS#8) PEM. Escaped `\n` sequences are unescaped first.
    pub fn from_pem(key_pair_id: impl Into<String>, pem: &str) -> Result<Self> {
        let pem = pem.replace("\\n", "\n");
        let key = RsaPrivateKey::from_pkcs1_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(&pem))
            .context("CloudFront private key is not a valid RSA PEM")?;
        Ok(Self::new(key_pair_id, key))
    }

    pub fn sign(&self, url: &str, expires_at: DateTime<Utc>) -> String {
        let epoch = expires_at.timestamp();
        let policy = canned_policy(url, epoch);
        let signature = self.signing_key.sign(policy.as_bytes()).to_bytes();
        let encoded = cloudfront_b64(&signature);
        let separator = if url.contains('?') { '&' } else { '?' };
        format!(
            "{url}{separator}Expires={epoch}&Signature={encoded}&Key-Pair-Id={}",
            self.key_pair_id
        )
    }
}

pub fn canned_policy(url: &str, epoch: i64) -> String {
    format!(
        r#"{{"Statement":[{{"Resource":"{url}","Condition":{{"DateLessThan":{{"AWS:EpochTime":{epoch}}}}}}}]}}"#
    )
}

/// Base64 with CloudFront's URL-safe substitutions (`+`→`-`, `=`→`_`, `/`→`~`).
pub fn cloudfront_b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD
        .encode(bytes)
        .replace('+', "-")
        .replace('=', "_")
        .replace('/', "~")
}

/// Lazily loads the signing key from Secrets Manager and signs report paths.
pub struct ReportUrlSigner {
    secrets: aws_sdk_secretsmanager::Client,
    secret_name: String,
    key_pair_id: String,
    domain: String,
    signer: OnceCell<CloudFrontSigner>,
}

impl ReportUrlSigner {
    pub fn new(
        secrets: aws_sdk_secretsmanager::Client,
        secret_name: impl Into<String>,
        key_pair_id: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            secrets,
            secret_name: secret_name.into(),
            key_pair_id: key_pair_id.into(),
            domain: domain.into(),
            signer: OnceCell::new(),
        }
    }

    /// Signs `{domain}{path}` for [`REPORT_URL_TTL_HOURS`].
    pub async fn sign_path(&self, path: &str) -> Result<String> {
        let signer = self
            .signer
            .get_or_try_init(|| self.load_signer())
            .await?;
        let url = format!("{}{}", self.domain.trim_end_matches('/'), path);
        Ok(signer.sign(&url, Utc::now() + Duration::hours(REPORT_URL_TTL_HOURS)))
    }

    async fn load_signer(&self) -> Result<CloudFrontSigner> {
        let output = self
            .secrets
            .get_secret_value()
            .secret_id(&self.secret_name)
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "reading secret {} failed: {}",
                    self.secret_name,
                    aws_sdk_secretsmanager::error::DisplayErrorContext(&e)
                )
            })?;

        let secret = output
            .secret_string()
            .ok_or_else(|| anyhow!("secret {} has no SecretString", self.secret_name))?;
        let parsed: serde_json::Value =
            serde_json::from_str(secret).context("CloudFront secret is not JSON")?;
        let pem = parsed
            .get("private_key.pem")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("private_key.pem not found in secret"))?;

        info!("Loaded CloudFront signing key from {}", self.secret_name);
        CloudFrontSigner::from_pem(&self.key_pair_id, pem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;

    fn decode_signature(encoded: &str) -> Vec<u8> {
        let standard = encoded.replace('-', "+").replace('_', "=").replace('~', "/");
        base64::engine::general_purpose::STANDARD
            .decode(standard)
            .unwrap()
    }

    #[test]
    fn test_canned_policy_is_compact_json() {
        let policy = canned_policy("https://d1.cloudfront.net/kim/v_report.pdf", 1700000000);
        assert_eq!(
            policy,
            r#"{"Statement":[{"Resource":"https://d1.cloudfront.net/kim/v_report.pdf","Condition":{"DateLessThan":{"AWS:EpochTime":1700000000}}}]}"#
        );
        let parsed: serde_json::Value = serde_json::from_str(&policy).unwrap();
        assert_eq!(
            parsed["Statement"][0]["Condition"]["DateLessThan"]["AWS:EpochTime"],
            1700000000
        );
    }

    #[test]
    fn test_cloudfront_b64_substitutions() {
        // 0xfb 0xff encodes to "+/8=" in standard base64
        assert_eq!(cloudfront_b64(&[0xfb, 0xff]), "-~8_");
    }

    #[test]
    fn test_signed_url_verifies_with_public_key() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public_key = private_key.to_public_key();
        let signer = CloudFrontSigner::new("KPAIR123", private_key);

        let resource = "https://d1.cloudfront.net/kim/0614-2_report.pdf";
        let expires = DateTime::<Utc>::from_timestamp(1_900_000_000, 0).unwrap();
        let signed = signer.sign(resource, expires);

        assert!(signed.starts_with(&format!("{resource}?Expires=1900000000&Signature=")));
        assert!(signed.ends_with("&Key-Pair-Id=KPAIR123"));

        let encoded = signed
            .split("Signature=")
            .nth(1)
            .and_then(|s| s.split('&').next())
            .unwrap();
        let signature = Signature::try_from(decode_signature(encoded).as_slice()).unwrap();
        let verifying_key = VerifyingKey::<Sha1>::new(public_key);
        verifying_key
            .verify(canned_policy(resource, 1_900_000_000).as_bytes(), &signature)
            .unwrap();
    }

    #[test]
    fn test_existing_query_string_uses_ampersand() {
        let mut rng = rand::thread_rng();
        let signer = CloudFrontSigner::new("K", RsaPrivateKey::new(&mut rng, 1024).unwrap());
        let signed = signer.sign("https://d1.cloudfront.net/a.pdf?v=1", Utc::now());
        assert!(signed.contains("a.pdf?v=1&Expires="));
    }

    #[test]
    fn test_from_pem_rejects_garbage() {
        assert!(CloudFrontSigner::from_pem("K", "not a key").is_err());
    }
}
