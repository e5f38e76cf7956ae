//! Object-storage helpers for user documents (S3 / MinIO).

use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// Keeps `[A-Za-z0-9._-]`, maps everything else to `_`, and caps the length.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = cleaned.chars().take(100).collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

pub fn object_key(user_id: Uuid, document_id: Uuid, file_name: &str) -> String {
    format!("documents/{user_id}/{document_id}-{}", sanitize_file_name(file_name))
}

pub async fn put_object(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: Bytes,
    content_type: &str,
) -> Result<(), AppError> {
    let size = body.len();
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;
    info!("Uploaded {size} bytes to s3://{bucket}/{key}");
    Ok(())
}

pub async fn delete_object(s3: &aws_sdk_s3::Client, bucket: &str, key: &str) -> Result<(), AppError> {
    s3.delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("delete of {key} failed: {e}")))?;
    Ok(())
}

/// A time-limited GET link for one object.
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn presign_get(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    ttl_secs: u64,
) -> Result<SignedUrl, AppError> {
    let ttl = Duration::from_secs(ttl_secs);
    let config = PresigningConfig::expires_in(ttl)
        .map_err(|e| AppError::S3(format!("invalid presign ttl: {e}")))?;
    let request = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(config)
        .await
        .map_err(|e| AppError::S3(format!("presign of {key} failed: {e}")))?;
    Ok(SignedUrl {
        url: request.uri().to_string(),
        expires_at: Utc::now() + chrono::Duration::seconds(ttl_secs as i64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_paths_and_odd_chars() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\My CV (final).pdf"), "My_CV__final_.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn test_object_key_layout() {
        let user = Uuid::nil();
        let doc = Uuid::nil();
        assert_eq!(
            object_key(user, doc, "cv.pdf"),
            format!("documents/{user}/{doc}-cv.pdf")
        );
    }

    #[tokio::test]
    async fn test_presign_is_local_and_carries_expiry() {
        let s3 = crate::test_support::s3_client();
        let signed = presign_get(&s3, "bucket", "documents/a/b-cv.pdf", 900)
            .await
            .unwrap();
        assert!(signed.url.contains("documents/a/b-cv.pdf"));
        assert!(signed.url.contains("X-Amz-Expires=900"));
        assert!(signed.expires_at > Utc::now());
    }
}
