use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blog_posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    pub summary: String,
    /// HTML or markdown body.
    #[sea_orm(column_type = "Text")]
    pub body: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,
    /// `draft`, `published` or `needs_attention`.
    pub status: String,
    pub published_at: Option<DateTimeUtc>,

    /// Media asset shown as the cover image.
    pub featured_image_id: Option<Uuid>,
    /// JSON array of media asset ids in source order.
    #[sea_orm(column_type = "JsonBinary")]
    pub inline_media_ids: Json,

    /// `api` for ingested posts, `admin` for posts written in the panel.
    pub source: String,
    pub api_key_id: Option<Uuid>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,

    #[sea_orm(has_many)]
    pub media_assets: HasMany<super::media_asset::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
