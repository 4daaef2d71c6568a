use chrono::Utc;
use common::storage::{ContentHash, upload_content_addressed};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{ContentStatus, IngestionOutcome, Pipeline};
use crate::entity::portfolio_item;
use crate::error::AppError;
use crate::utils::media::{Association, MediaSource, NewMedia, upsert_media};

/// Object-key prefix for captured screenshots.
pub const SCREENSHOT_PREFIX: &str = "portfolio/screenshots";

/// Per-item key prefix, so items with identical screenshots never share an object.
pub fn screenshot_prefix(source_url: &str) -> String {
    let digest = ContentHash::compute(source_url.as_bytes()).to_hex();
    format!("{SCREENSHOT_PREFIX}/{}", &digest[..16])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortfolioKind {
    Web,
    App,
}

impl PortfolioKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "web" => Some(PortfolioKind::Web),
            "app" => Some(PortfolioKind::App),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PortfolioKind::Web => "web",
            PortfolioKind::App => "app",
        }
    }
}

/// Caller-supplied values that take precedence over fetched metadata.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A validated portfolio ingestion request.
#[derive(Debug, Clone)]
pub struct PortfolioRequest {
    pub source_url: String,
    pub kind: PortfolioKind,
    pub featured: bool,
    pub order_rank: i32,
    pub overrides: Overrides,
}

#[derive(Debug)]
pub struct PortfolioIngested {
    pub record: portfolio_item::Model,
    pub status: ContentStatus,
    pub screenshot_path: Option<String>,
    pub outcome: IngestionOutcome,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Enrich, capture and upsert one portfolio item keyed by its source URL.
///
/// App-catalog, screenshot and upload failures degrade the record to
/// `needs_attention`; only database failures abort.
pub async fn ingest_portfolio(
    pipeline: Pipeline<'_>,
    request: PortfolioRequest,
) -> Result<PortfolioIngested, AppError> {
    let mut outcome = IngestionOutcome::default();
    let source_url = request.source_url.as_str();

    let mut metadata_snapshot = json!({});
    let mut fetched_title = None;
    let mut fetched_summary = None;
    if request.kind == PortfolioKind::App {
        let lookup = pipeline.fetcher.lookup_app(source_url).await;
        if let Some(app) = outcome.absorb("app_lookup", source_url, lookup) {
            fetched_title = Some(app.title.clone());
            fetched_summary = Some(app.summary.clone());
            metadata_snapshot["appStore"] = serde_json::to_value(&app)
                .map_err(|e| AppError::Internal(format!("App metadata serialization: {e}")))?;
        }
    }

    let capture = pipeline.fetcher.capture_screenshot(source_url).await;
    let uploaded = match outcome.absorb("screenshot", source_url, capture) {
        Some(shot) => {
            let upload = upload_content_addressed(
                pipeline.store,
                &shot.bytes,
                &shot.content_type,
                &screenshot_prefix(source_url),
                None,
            )
            .await;
            outcome
                .absorb("upload", source_url, upload)
                .map(|uploaded| (uploaded, shot.content_type))
        }
        None => None,
    };

    let title = non_empty(request.overrides.title)
        .or(non_empty(fetched_title))
        .unwrap_or_default();
    let summary = non_empty(request.overrides.summary)
        .or(non_empty(fetched_summary))
        .unwrap_or_default();
    let tags = Value::from(request.overrides.tags.unwrap_or_default());
    let status = outcome.status(ContentStatus::Published);
    let screenshot_path = uploaded.as_ref().map(|(u, _)| u.path.clone());
    let now = Utc::now();

    let row = portfolio_item::ActiveModel {
        id: Set(Uuid::now_v7()),
        source_url: Set(request.source_url.clone()),
        kind: Set(request.kind.as_str().to_string()),
        title: Set(title.clone()),
        summary: Set(summary),
        body: Set(String::new()),
        tags: Set(tags),
        status: Set(status.as_str().to_string()),
        featured: Set(request.featured),
        order_rank: Set(request.order_rank),
        screenshot_path: Set(screenshot_path.clone()),
        metadata_snapshot: Set(metadata_snapshot),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let mut update_columns = vec![
        portfolio_item::Column::Kind,
        portfolio_item::Column::Title,
        portfolio_item::Column::Summary,
        portfolio_item::Column::Tags,
        portfolio_item::Column::Status,
        portfolio_item::Column::Featured,
        portfolio_item::Column::OrderRank,
        portfolio_item::Column::MetadataSnapshot,
        portfolio_item::Column::UpdatedAt,
    ];
    // A failed capture keeps the previous screenshot.
    if screenshot_path.is_some() {
        update_columns.push(portfolio_item::Column::ScreenshotPath);
    }

    portfolio_item::Entity::insert(row)
        .on_conflict(
            OnConflict::column(portfolio_item::Column::SourceUrl)
                .update_columns(update_columns)
                .to_owned(),
        )
        .exec_without_returning(pipeline.db)
        .await?;

    let record = portfolio_item::Entity::find()
        .filter(portfolio_item::Column::SourceUrl.eq(&request.source_url))
        .one(pipeline.db)
        .await?
        .ok_or_else(|| AppError::Internal("portfolio item missing after upsert".into()))?;

    if let Some((uploaded, content_type)) = uploaded {
        let alt_text = if title.is_empty() {
            "Screenshot".to_string()
        } else {
            title
        };
        upsert_media(
            pipeline.db,
            NewMedia {
                url: pipeline.store.public_url(&uploaded.path),
                storage_path: uploaded.path,
                alt_text: Some(alt_text),
                caption: None,
                mime_type: Some(content_type),
                size_bytes: i64::try_from(uploaded.size).ok(),
                checksum: Some(uploaded.checksum.to_hex()),
                source: MediaSource::Capture,
                association: Some(Association::Portfolio(record.id)),
            },
        )
        .await?;
    }

    Ok(PortfolioIngested {
        record,
        status,
        screenshot_path,
        outcome,
    })
}
