//! Object storage access. Every S3 call in the service goes through `ObjectStore`
//! so error mapping and logging stay in one place.

pub mod cloudfront;
pub mod keys;

use std::time::Duration;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::errors::AppError;

/// One entry from a prefix listing.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct ObjectStore {
    client: aws_sdk_s3::Client,
    region: String,
}

impl ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    pub async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<(), AppError> {
        let body: Bytes = body.into();
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                AppError::S3(format!(
                    "put s3://{bucket}/{key} failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        info!("Uploaded s3://{bucket}/{key} ({size} bytes)");
        Ok(())
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, AppError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::S3(format!(
                    "get s3://{bucket}/{key} failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::S3(format!("reading s3://{bucket}/{key} failed: {e}")))?;
        Ok(data.into_bytes())
    }

    pub async fn get_text(&self, bucket: &str, key: &str) -> Result<String, AppError> {
        let bytes = self.get(bucket, key).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn delete(&self, bucket: &str, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::S3(format!(
                    "delete s3://{bucket}/{key} failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        info!("Deleted s3://{bucket}/{key}");
        Ok(())
    }

    /// HEAD the object. A 404 is `Ok(false)`; any other failure is an error.
    pub async fn exists(&self, bucket: &str, key: &str) -> Result<bool, AppError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().map(|se| se.is_not_found()) == Some(true) {
                    Ok(false)
                } else {
                    Err(AppError::S3(format!(
                        "head s3://{bucket}/{key} failed: {}",
                        DisplayErrorContext(&e)
                    )))
                }
            }
        }
    }

    /// Lists every object under `prefix`, following continuation tokens.
    pub async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, AppError> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    AppError::S3(format!(
                        "list s3://{bucket}/{prefix} failed: {}",
                        DisplayErrorContext(&e)
                    ))
                })?;

            for object in output.contents() {
                let Some(key) = object.key() else { continue };
                let last_modified = object
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()));
                objects.push(ObjectSummary {
                    key: key.to_string(),
                    last_modified,
                });
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated() == Some(true) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!("Listed {} objects under s3://{bucket}/{prefix}", objects.len());
        Ok(objects)
    }

    /// Keys under `prefix` ending with `suffix`, sorted lexicographically.
    pub async fn list_keys_with_suffix(
        &self,
        bucket: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<Vec<String>, AppError> {
        let mut keys: Vec<String> = self
            .list(bucket, prefix)
            .await?
            .into_iter()
            .map(|o| o.key)
            .filter(|k| k.ends_with(suffix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    pub async fn presigned_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, AppError> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| AppError::S3(format!("invalid presign duration: {e}")))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| {
                AppError::S3(format!(
                    "presign s3://{bucket}/{key} failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(request.uri().to_string())
    }

    /// Polls until the object exists, checking `attempts` times `interval` apart.
    /// Returns whether it appeared.
    pub async fn wait_for_object(
        &self,
        bucket: &str,
        key: &str,
        attempts: u32,
        interval: Duration,
    ) -> Result<bool, AppError> {
        let found = poll_until(attempts, interval, || self.exists(bucket, key)).await?;
        if let Some(attempt) = found {
            debug!("s3://{bucket}/{key} appeared on poll {attempt}");
        }
        Ok(found.is_some())
    }

    /// Virtual-hosted-style URL of an object in this store's region.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        keys::public_object_url(bucket, &self.region, key)
    }
}

/// Runs `check` up to `attempts` times, sleeping `interval` between tries but
/// not after the last one. Returns the 1-based attempt that succeeded.
async fn poll_until<F, Fut>(attempts: u32, interval: Duration, mut check: F) -> Result<Option<u32>, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool, AppError>>,
{
    for attempt in 1..=attempts {
        if check().await? {
            return Ok(Some(attempt));
        }
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_poll_gives_up_without_trailing_sleep() {
        let calls = &AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let found = poll_until(3, Duration::from_secs(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        })
        .await
        .unwrap();

        assert_eq!(found, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_reports_the_attempt_that_succeeded() {
        let calls = &AtomicU32::new(0);
        let found = poll_until(10, Duration::from_secs(1), move || async move {
            Ok(calls.fetch_add(1, Ordering::SeqCst) == 1)
        })
        .await
        .unwrap();
        assert_eq!(found, Some(2));
    }

    #[tokio::test]
    async fn test_poll_propagates_errors() {
        let result = poll_until(3, Duration::from_millis(1), || async {
            Err(AppError::S3("head failed".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AppError::S3(_))));
    }
}
