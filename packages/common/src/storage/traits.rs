use async_trait::async_trait;

use super::error::StorageError;

/// Metadata returned by a stat lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
    pub content_type: Option<String>,
    /// Backend entity tag, unquoted. For the filesystem store this is the SHA-256 hex digest.
    pub e_tag: Option<String>,
}

/// Key-addressed object storage (an S3 bucket or a local directory).
///
/// Writes are upserts: putting to an existing key overwrites it, so retries are safe.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket objects are written to.
    fn bucket(&self) -> &str;

    /// Store bytes under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Look up size and type of an existing object.
    async fn stat(&self, key: &str) -> Result<ObjectMeta, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.stat(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Issue a time-boxed URL that accepts a direct `PUT` of the object.
    async fn presign_put(&self, key: &str, expires_secs: u32) -> Result<String, StorageError>;

    /// Public URL under which the object is served.
    fn public_url(&self, key: &str) -> String;
}
