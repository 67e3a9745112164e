use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::{BlobStore, BoxReader, SignedUrlIssuer};

/// Settings for URLs issued by a [`FilesystemBlobStore`].
#[derive(Clone)]
pub struct UrlSigning {
    /// URL prefix under which the server exposes stored objects,
    /// e.g. `http://localhost:3000/api/v1/blobs`.
    pub base_url: String,
    pub secret: String,
}

/// Filesystem-backed key-addressed blob store.
///
/// Objects live at `{base_path}/objects/{key}`; writes go through
/// `{base_path}/.tmp` and are renamed into place so readers never observe
/// a partially written object.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
    signing: Option<UrlSigning>,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(base_path.join("objects")).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
            signing: None,
        })
    }

    /// Enable signed URL issuance.
    pub fn with_signing(mut self, signing: UrlSigning) -> Self {
        self.signing = Some(signing);
        self
    }

    /// Compute the filesystem path for a given key.
    fn object_path(&self, key: &ObjectKey) -> PathBuf {
        key.segments()
            .fold(self.base_path.join("objects"), |path, segment| {
                path.join(segment)
            })
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    fn signing(&self) -> Result<&UrlSigning, StorageError> {
        self.signing
            .as_ref()
            .ok_or_else(|| StorageError::Signature("URL signing is not configured".into()))
    }

    /// Check a signature previously produced by [`SignedUrlIssuer::sign`].
    pub fn verify(
        &self,
        key: &ObjectKey,
        expires: i64,
        signature: &str,
    ) -> Result<(), StorageError> {
        let signing = self.signing()?;
        if Utc::now().timestamp() > expires {
            return Err(StorageError::Signature("URL has expired".into()));
        }
        let provided = hex::decode(signature)
            .map_err(|_| StorageError::Signature("malformed signature".into()))?;
        url_mac(&signing.secret, key, expires)?
            .verify_slice(&provided)
            .map_err(|_| StorageError::Signature("signature mismatch".into()))
    }
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over `key` and `expires`, NUL separated.
fn url_mac(secret: &str, key: &ObjectKey, expires: i64) -> Result<HmacSha256, StorageError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StorageError::Signature(format!("invalid signing key: {e}")))?;
    mac.update(key.as_str().as_bytes());
    mac.update(&[0u8]);
    mac.update(expires.to_string().as_bytes());
    Ok(mac)
}

fn signature_for(secret: &str, key: &ObjectKey, expires: i64) -> Result<String, StorageError> {
    Ok(hex::encode(url_mac(secret, key, expires)?.finalize().into_bytes()))
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(
        &self,
        key: &ObjectKey,
        data: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let object_path = self.object_path(key);
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn get_stream(&self, key: &ObjectKey) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.object_path(key)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        match fs::remove_file(self.object_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SignedUrlIssuer for FilesystemBlobStore {
    async fn sign(&self, key: &ObjectKey, ttl: Duration) -> Result<String, StorageError> {
        let signing = self.signing()?;
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp().saturating_add(ttl);
        let signature = signature_for(&signing.secret, key, expires)?;
        Ok(format!(
            "{}/{key}?expires={expires}&signature={signature}",
            signing.base_url.trim_end_matches('/')
        ))
    }
}
