use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media_assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Object key inside the media bucket.
    #[sea_orm(unique)]
    pub storage_path: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    /// SHA-256 hex digest of the stored bytes, when known.
    pub checksum: Option<String>,
    /// `upload` or `capture`.
    pub source: String,

    pub portfolio_item_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "portfolio_item_id", to = "id")]
    pub portfolio_item: BelongsTo<Option<super::portfolio_item::Entity>>,

    pub blog_post_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "blog_post_id", to = "id")]
    pub blog_post: BelongsTo<Option<super::blog_post::Entity>>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
