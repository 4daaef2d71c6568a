use chrono::Utc;
use common::storage::ObjectStore;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entity::{blog_post, media_asset, portfolio_item};

/// MIME types accepted for uploaded images.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

pub fn is_allowed_image_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(content_type.trim()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource {
    Upload,
    Capture,
}

impl MediaSource {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaSource::Upload => "upload",
            MediaSource::Capture => "capture",
        }
    }
}

/// Content record a media asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    Portfolio(Uuid),
    Blog(Uuid),
}

impl Association {
    /// Parse an `associatedType`/`associatedId` pair from a request.
    pub fn parse(kind: Option<&str>, id: Option<Uuid>) -> Result<Option<Self>, String> {
        match (kind, id) {
            (None, None) => Ok(None),
            (Some("portfolio"), Some(id)) => Ok(Some(Association::Portfolio(id))),
            (Some("blog"), Some(id)) => Ok(Some(Association::Blog(id))),
            (Some("portfolio" | "blog"), None) => {
                Err("associatedId is required with associatedType".into())
            }
            (None, Some(_)) => Err("associatedType is required with associatedId".into()),
            (Some(_), _) => Err("associatedType must be portfolio or blog".into()),
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Association::Portfolio(_) => "portfolio",
            Association::Blog(_) => "blog",
        }
    }

    /// Message for a 404 when the referenced record is missing.
    pub fn missing_message(self) -> &'static str {
        match self {
            Association::Portfolio(_) => "Portfolio item not found",
            Association::Blog(_) => "Blog post not found",
        }
    }

    fn columns(self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            Association::Portfolio(id) => (Some(id), None),
            Association::Blog(id) => (None, Some(id)),
        }
    }
}

/// Whether the portfolio item or blog post an association names exists.
pub async fn association_exists<C: ConnectionTrait>(
    db: &C,
    association: Association,
) -> Result<bool, DbErr> {
    let count = match association {
        Association::Portfolio(id) => portfolio_item::Entity::find_by_id(id).count(db).await?,
        Association::Blog(id) => blog_post::Entity::find_by_id(id).count(db).await?,
    };
    Ok(count > 0)
}

/// A media asset row to write.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub storage_path: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub checksum: Option<String>,
    pub source: MediaSource,
    pub association: Option<Association>,
}

/// Insert a media asset, or refresh the row already recorded for its storage path.
pub async fn upsert_media<C: ConnectionTrait>(
    db: &C,
    media: NewMedia,
) -> Result<media_asset::Model, DbErr> {
    let (portfolio_item_id, blog_post_id) = media
        .association
        .map(Association::columns)
        .unwrap_or((None, None));

    let row = media_asset::ActiveModel {
        id: Set(Uuid::now_v7()),
        storage_path: Set(media.storage_path.clone()),
        url: Set(media.url),
        alt_text: Set(media.alt_text),
        caption: Set(media.caption),
        mime_type: Set(media.mime_type),
        size_bytes: Set(media.size_bytes),
        checksum: Set(media.checksum),
        source: Set(media.source.as_str().to_string()),
        portfolio_item_id: Set(portfolio_item_id),
        blog_post_id: Set(blog_post_id),
        created_at: Set(Utc::now()),
    };

    media_asset::Entity::insert(row)
        .on_conflict(
            OnConflict::column(media_asset::Column::StoragePath)
                .update_columns([
                    media_asset::Column::Url,
                    media_asset::Column::AltText,
                    media_asset::Column::Caption,
                    media_asset::Column::MimeType,
                    media_asset::Column::SizeBytes,
                    media_asset::Column::Checksum,
                    media_asset::Column::Source,
                    media_asset::Column::PortfolioItemId,
                    media_asset::Column::BlogPostId,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    media_asset::Entity::find()
        .filter(media_asset::Column::StoragePath.eq(&media.storage_path))
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("media asset missing after upsert".into()))
}

/// Remove backing objects, logging failures instead of propagating them.
///
/// Returns how many objects were actually removed.
pub async fn remove_objects_best_effort(store: &dyn ObjectStore, paths: &[String]) -> usize {
    let mut removed = 0;
    for path in paths {
        match store.delete(path).await {
            Ok(true) => removed += 1,
            Ok(false) => tracing::debug!(path = %path, "Object already absent"),
            Err(e) => tracing::warn!(path = %path, error = %e, "Failed to delete object; row removed anyway"),
        }
    }
    removed
}
