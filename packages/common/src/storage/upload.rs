use serde::Serialize;

use super::error::StorageError;
use super::hash::ContentHash;
use super::key::validate_object_key;
use super::traits::ObjectStore;

/// Location and digest of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedObject {
    pub path: String,
    pub checksum: ContentHash,
    pub size: u64,
}

/// Upload `data` under `{path_prefix}/{file_name}`.
///
/// Without a file name the checksum is used, so identical bytes under the same prefix
/// always land on the same key and a repeat upload overwrites in place.
pub async fn upload_content_addressed(
    store: &dyn ObjectStore,
    data: &[u8],
    content_type: &str,
    path_prefix: &str,
    file_name: Option<&str>,
) -> Result<UploadedObject, StorageError> {
    let checksum = ContentHash::compute(data);
    let name = match file_name {
        Some(name) => name.to_string(),
        None => checksum.to_hex(),
    };
    let path = format!("{}/{}", path_prefix.trim_matches('/'), name);
    validate_object_key(&path)?;

    store.put(&path, data, content_type).await?;

    Ok(UploadedObject {
        path,
        checksum,
        size: data.len() as u64,
    })
}
