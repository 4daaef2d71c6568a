use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{info, warn};

use super::error::StorageError;
use super::traits::{ObjectMeta, ObjectStore};

/// Connection settings for an S3-compatible bucket (AWS, MinIO, R2).
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Base URL objects are publicly served from. Falls back to `{endpoint}`.
    pub public_base_url: Option<String>,
}

/// Object store backed by an S3-compatible bucket using path-style addressing.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    name: String,
    public_base_url: String,
}

impl S3ObjectStore {
    /// Connect to the bucket, creating it with a public-read ACL if it does not exist.
    pub async fn connect(settings: S3Settings) -> Result<Self, StorageError> {
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

        let bucket = Bucket::new(&settings.bucket, region.clone(), credentials.clone())
            .map_err(backend)?
            .with_path_style();

        match bucket.exists().await {
            Ok(true) => {}
            Ok(false) => {
                Bucket::create_with_path_style(
                    &settings.bucket,
                    region,
                    credentials,
                    BucketConfiguration::public(),
                )
                .await
                .map_err(backend)?;
                info!(bucket = %settings.bucket, "Created public-read bucket");
            }
            Err(e) => {
                // Some providers deny ListBuckets to scoped keys; writes may still succeed.
                warn!(bucket = %settings.bucket, error = %e, "Could not verify bucket existence");
            }
        }

        let public_base_url = settings
            .public_base_url
            .unwrap_or(settings.endpoint)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bucket,
            name: settings.bucket,
            public_base_url,
        })
    }
}

fn backend(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn check_status(key: &str, code: u16) -> Result<(), StorageError> {
    match code {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for {key}"
        ))),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(backend)?;
        check_status(key, response.status_code())
    }

    async fn stat(&self, key: &str) -> Result<ObjectMeta, StorageError> {
        let (head, code) = match self.bucket.head_object(key).await {
            Ok(result) => result,
            Err(S3Error::HttpFailWithBody(404, _)) => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(backend(e)),
        };
        check_status(key, code)?;

        Ok(ObjectMeta {
            size: head
                .content_length
                .and_then(|len| u64::try_from(len).ok())
                .unwrap_or_default(),
            content_type: head.content_type,
            e_tag: head.e_tag.map(|tag| tag.trim_matches('"').to_string()),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let response = match self.bucket.delete_object(key).await {
            Ok(response) => response,
            Err(S3Error::HttpFailWithBody(404, _)) => return Ok(false),
            Err(e) => return Err(backend(e)),
        };
        match check_status(key, response.status_code()) {
            Ok(()) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn presign_put(&self, key: &str, expires_secs: u32) -> Result<String, StorageError> {
        self.bucket
            .presign_put(key, expires_secs, None, None)
            .await
            .map_err(backend)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.name, key)
    }
}
