use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;
use super::key::ObjectKey;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Key-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, replacing any existing object.
    async fn put(
        &self,
        key: &ObjectKey,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Retrieve an object as a streaming async reader.
    async fn get_stream(&self, key: &ObjectKey) -> Result<BoxReader, StorageError>;

    /// Delete the object under `key`.
    ///
    /// Returns `true` if an object was deleted, `false` if it did not exist.
    async fn delete(&self, key: &ObjectKey) -> Result<bool, StorageError>;
}

/// Issues short-lived read URLs for stored objects.
///
/// URLs are produced on every read and never persisted.
#[async_trait]
pub trait SignedUrlIssuer: Send + Sync {
    async fn sign(&self, key: &ObjectKey, ttl: Duration) -> Result<String, StorageError>;
}
