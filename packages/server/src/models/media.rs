use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::media_asset;
use crate::error::AppError;
use crate::utils::media::Association;

/// `POST /media/upload` body. `data` is the base64-encoded image.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadMediaRequest {
    #[schema(example = "hero.png")]
    pub filename: String,
    #[schema(example = "image/png")]
    pub content_type: String,
    pub data: String,
    pub alt_text: String,
    pub caption: Option<String>,
    /// `portfolio` or `blog`.
    pub associated_type: Option<String>,
    pub associated_id: Option<Uuid>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// Key prefix, e.g. `portfolio` or `blog`. Defaults to `uploads`.
    pub purpose: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub upload_url: String,
    pub object_key: String,
    /// Seconds the upload URL stays valid.
    #[schema(example = 300)]
    pub expires_in: u32,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub object_key: String,
    pub alt_text: String,
    pub caption: Option<String>,
    pub associated_type: Option<String>,
    pub associated_id: Option<Uuid>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMediaRequest {
    pub object_key: String,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MediaListQuery {
    /// Case-insensitive match on alt text or storage path.
    pub q: Option<String>,
    /// Default 50, at most 200.
    pub limit: Option<u64>,
}

pub const DEFAULT_LIST_LIMIT: u64 = 50;
pub const MAX_LIST_LIMIT: u64 = 200;

impl MediaListQuery {
    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaAssetResponse {
    pub id: Uuid,
    pub storage_path: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub checksum: Option<String>,
    pub source: String,
    pub portfolio_item_id: Option<Uuid>,
    pub blog_post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<media_asset::Model> for MediaAssetResponse {
    fn from(m: media_asset::Model) -> Self {
        Self {
            id: m.id,
            storage_path: m.storage_path,
            url: m.url,
            alt_text: m.alt_text,
            caption: m.caption,
            mime_type: m.mime_type,
            size_bytes: m.size_bytes,
            checksum: m.checksum,
            source: m.source,
            portfolio_item_id: m.portfolio_item_id,
            blog_post_id: m.blog_post_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MediaListResponse {
    pub data: Vec<MediaAssetResponse>,
}

pub fn parse_association(
    kind: Option<&str>,
    id: Option<Uuid>,
) -> Result<Option<Association>, AppError> {
    Association::parse(kind.map(str::trim).filter(|k| !k.is_empty()), id)
        .map_err(AppError::Validation)
}

pub fn require_alt_text(alt_text: &str) -> Result<String, AppError> {
    let alt_text = alt_text.trim();
    if alt_text.is_empty() {
        return Err(AppError::Validation("altText is required".into()));
    }
    Ok(alt_text.to_string())
}
