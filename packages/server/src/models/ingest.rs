use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shared::non_blank;
use crate::error::AppError;
use crate::ingestion::ContentStatus;
use crate::ingestion::portfolio::{Overrides, PortfolioKind, PortfolioRequest};

#[derive(Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioOverridesBody {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioIngestRequest {
    /// Public URL of the site or app-catalog listing. Upsert key.
    #[schema(example = "https://apps.apple.com/us/app/example/id1234567890")]
    pub source_url: Option<String>,
    /// `web` or `app`.
    #[serde(rename = "type")]
    #[schema(example = "app")]
    pub kind: Option<String>,
    pub featured: Option<bool>,
    pub order_rank: Option<i32>,
    pub overrides: Option<PortfolioOverridesBody>,
}

pub fn validate_portfolio_request(
    payload: PortfolioIngestRequest,
) -> Result<PortfolioRequest, AppError> {
    let (Some(source_url), Some(kind)) = (non_blank(payload.source_url), non_blank(payload.kind))
    else {
        return Err(AppError::Validation("sourceUrl and type are required".into()));
    };

    let kind = PortfolioKind::parse(&kind)
        .ok_or_else(|| AppError::Validation("type must be web or app".into()))?;

    if !(source_url.starts_with("http://") || source_url.starts_with("https://")) {
        return Err(AppError::Validation("sourceUrl must be an http(s) URL".into()));
    }

    let overrides = payload.overrides.unwrap_or_default();
    Ok(PortfolioRequest {
        source_url,
        kind,
        featured: payload.featured.unwrap_or(false),
        order_rank: payload.order_rank.unwrap_or(0),
        overrides: Overrides {
            title: overrides.title,
            summary: overrides.summary,
            tags: overrides.tags,
        },
    })
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioIngestResponse {
    pub id: Uuid,
    pub status: ContentStatus,
    /// True when any enrichment step failed.
    pub needs_attention: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
    #[schema(example = "public-media")]
    pub bucket: String,
    pub correlation_id: String,
}

#[derive(utoipa::ToSchema)]
pub struct InlineImageBody {
    #[schema(example = "https://cdn.example.com/diagram.png")]
    pub url: String,
    #[schema(example = "Architecture diagram")]
    pub alt: String,
}

/// Documented shape of `POST /ingest/blog`; the handler validates the raw JSON
/// so that each missing field gets its own message.
#[derive(utoipa::ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct BlogIngestRequest {
    pub title: String,
    /// Letters, digits, `-` and `_`. Must be unused.
    #[schema(example = "shipping-the-atelier")]
    pub slug: String,
    pub summary: String,
    pub body: String,
    pub tags: Vec<String>,
    pub images: Vec<InlineImageBody>,
    pub featured_image: Option<String>,
    /// Defaults to `true`; `false` stores a draft.
    pub publish: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlogIngestResponse {
    pub id: Uuid,
    pub status: ContentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image_path: Option<String>,
    pub inline_paths: Vec<String>,
    pub correlation_id: String,
}
