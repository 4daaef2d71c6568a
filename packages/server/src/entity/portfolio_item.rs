use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A portfolio showcase entry, re-synced from its source URL on every ingestion.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "portfolio_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Natural key; ingestion upserts on this column.
    #[sea_orm(unique)]
    pub source_url: String,
    /// `web` or `app`.
    pub kind: String,
    pub title: String,
    pub summary: String,
    /// Always empty for ingested items.
    pub body: String,
    /// JSON array of tag strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,
    /// `draft`, `published` or `needs_attention`.
    pub status: String,
    pub featured: bool,
    pub order_rank: i32,
    pub screenshot_path: Option<String>,
    /// External metadata captured at ingestion time (e.g. `{"appStore": {...}}`).
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata_snapshot: Json,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,

    #[sea_orm(has_many)]
    pub media_assets: HasMany<super::media_asset::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
