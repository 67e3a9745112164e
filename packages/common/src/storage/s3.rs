use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use tracing::debug;

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::{BlobStore, BoxReader, SignedUrlIssuer};

/// Connection settings for an S3-compatible bucket (AWS, R2, MinIO).
#[derive(Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Blob store backed by an S3-compatible bucket using path-style addressing.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    max_size: u64,
}

impl S3BlobStore {
    pub fn new(settings: &S3Settings, max_size: u64) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: settings.region.clone(),
            endpoint: settings.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let bucket = Bucket::new(&settings.bucket, region, credentials)
            .map_err(backend)?
            .with_path_style();

        Ok(Self { bucket, max_size })
    }
}

fn retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Transport failures and throttled or 5xx replies are retryable.
fn backend(err: S3Error) -> StorageError {
    match &err {
        S3Error::Reqwest(_) | S3Error::Io(_) => StorageError::Unavailable(err.to_string()),
        S3Error::HttpFailWithBody(status, _) if retryable_status(*status) => {
            StorageError::Unavailable(err.to_string())
        }
        _ => StorageError::Backend(err.to_string()),
    }
}

fn check_status(status: u16, key: &ObjectKey) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        other if retryable_status(other) => Err(StorageError::Unavailable(format!(
            "status {other} for {key}"
        ))),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for {key}"
        ))),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        key: &ObjectKey,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let response = self
            .bucket
            .put_object_with_content_type(key.as_str(), data, content_type)
            .await
            .map_err(backend)?;
        check_status(response.status_code(), key)?;
        debug!(%key, size = data.len(), "object uploaded");
        Ok(())
    }

    async fn get_stream(&self, key: &ObjectKey) -> Result<BoxReader, StorageError> {
        let response = self
            .bucket
            .get_object(key.as_str())
            .await
            .map_err(backend)?;
        check_status(response.status_code(), key)?;
        Ok(Box::new(Cursor::new(response.bytes().to_vec())))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        let response = self
            .bucket
            .delete_object(key.as_str())
            .await
            .map_err(backend)?;
        match check_status(response.status_code(), key) {
            Ok(()) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SignedUrlIssuer for S3BlobStore {
    async fn sign(&self, key: &ObjectKey, ttl: Duration) -> Result<String, StorageError> {
        let expiry_secs = u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX);
        self.bucket
            .presign_get(key.as_str(), expiry_secs, None)
            .await
            .map_err(|e| StorageError::Signature(e.to_string()))
    }
}
