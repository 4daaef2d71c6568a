mod error;
mod hash;
mod key;
mod traits;
mod upload;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use hash::ContentHash;
pub use key::{disambiguated_key, sanitize_filename, validate_object_key};
pub use traits::{ObjectMeta, ObjectStore};
pub use upload::{UploadedObject, upload_content_addressed};
