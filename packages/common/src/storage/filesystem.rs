use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::hash::ContentHash;
use super::key::validate_object_key;
use super::traits::{ObjectMeta, ObjectStore};

/// Directory-backed object store for local development and tests.
///
/// Objects live at `{base_path}/{key}`; the content type of each object is kept
/// in a sidecar file under `{base_path}/.meta/{key}`.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    bucket: String,
    public_base_url: Option<String>,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store, creating its directories if needed.
    pub async fn new(
        base_path: PathBuf,
        bucket: impl Into<String>,
        public_base_url: Option<String>,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        fs::create_dir_all(base_path.join(".meta")).await?;
        Ok(Self {
            base_path,
            bucket: bucket.into(),
            public_base_url,
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join(validate_object_key(key)?))
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join(".meta").join(validate_object_key(key)?))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Read an object's bytes.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let object_path = self.object_path(key)?;
        let meta_path = self.meta_path(key)?;

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

        if let Some(parent) = meta_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&meta_path, content_type).await?;

        Ok(())
    }

    async fn stat(&self, key: &str) -> Result<ObjectMeta, StorageError> {
        let bytes = self.get(key).await?;
        let content_type = fs::read_to_string(self.meta_path(key)?)
            .await
            .ok()
            .filter(|s| !s.is_empty());

        Ok(ObjectMeta {
            size: bytes.len() as u64,
            content_type,
            e_tag: Some(ContentHash::compute(&bytes).to_hex()),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let object_path = self.object_path(key)?;
        let _ = fs::remove_file(self.meta_path(key)?).await;
        match fs::remove_file(&object_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn presign_put(&self, _key: &str, _expires_secs: u32) -> Result<String, StorageError> {
        Err(StorageError::Unsupported("presign_put"))
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}/{}", base.trim_end_matches('/'), self.bucket, key),
            None => format!("file://{}", self.base_path.join(key).display()),
        }
    }
}
