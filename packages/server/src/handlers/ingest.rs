use axum::{Json, extract::State, http::HeaderMap};
use serde_json::{Value, json};
use tracing::instrument;

use super::{audit_failure, enforce_rate_limit};
use crate::audit::{AuditEntry, AuditOutcome};
use crate::auth::{ActorType, CredentialVerifier, RejectionAudit, authorize};
use crate::error::{AppError, ErrorBody};
use crate::extractors::client::ClientInfo;
use crate::extractors::correlation::CorrelationId;
use crate::extractors::json::AppJson;
use crate::ingestion::Pipeline;
use crate::ingestion::blog::{BlogPayload, ingest_blog as run_blog};
use crate::ingestion::portfolio::ingest_portfolio as run_portfolio;
use crate::models::ingest::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/ingest/portfolio",
    tag = "Ingestion",
    operation_id = "ingestPortfolio",
    summary = "Ingest a portfolio item from a URL",
    description = "Captures a screenshot of `sourceUrl`, looks up app-catalog metadata for `app` items, \
        uploads the screenshot and upserts the item keyed by `sourceUrl`. Failed enrichment steps \
        do not fail the request; the item is stored with status `needs_attention` instead.",
    request_body = PortfolioIngestRequest,
    responses(
        (status = 200, description = "Item stored", body = PortfolioIngestResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (UNAUTHORIZED)", body = ErrorBody),
        (status = 403, description = "Forbidden (FORBIDDEN)", body = ErrorBody),
        (status = 429, description = "Rate limited (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all, fields(correlation_id = %correlation_id))]
pub async fn ingest_portfolio(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    payload: Result<AppJson<PortfolioIngestRequest>, AppError>,
) -> Result<Json<PortfolioIngestResponse>, AppError> {
    let actor = authorize(
        &state,
        &CredentialVerifier::PORTFOLIO_INGEST,
        &headers,
        &correlation_id,
        &client,
        RejectionAudit {
            action: "portfolio.ingest.rejected",
            entity_type: "portfolio_item",
            actor_type: ActorType::User,
        },
    )
    .await?;

    enforce_rate_limit(&state, &format!("portfolio:{}", actor.id))?;

    let AppJson(payload) = payload?;
    let request = validate_portfolio_request(payload)?;
    let source_url = request.source_url.clone();

    match run_portfolio(Pipeline::from_state(&state), request).await {
        Ok(ingested) => {
            let needs_attention = ingested.outcome.needs_attention();
            state
                .audit
                .record(
                    AuditEntry::by(
                        &actor,
                        "portfolio.ingest.success",
                        "portfolio_item",
                        AuditOutcome::Success,
                    )
                    .entity_id(ingested.record.id)
                    .correlation_id(correlation_id.as_str())
                    .client(&client)
                    .detail(with_source(ingested.outcome.audit_detail(), &source_url)),
                )
                .await;

            tracing::info!(
                id = %ingested.record.id,
                source_url = %source_url,
                needs_attention,
                "Portfolio item ingested"
            );

            Ok(Json(PortfolioIngestResponse {
                id: ingested.record.id,
                status: ingested.status,
                needs_attention,
                screenshot_path: ingested.screenshot_path,
                bucket: state.object_store.bucket().to_string(),
                correlation_id: correlation_id.0,
            }))
        }
        Err(e) => {
            audit_failure(
                &state,
                &actor,
                "portfolio.ingest.failed",
                "portfolio_item",
                &correlation_id,
                &client,
                &e,
            )
            .await;
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/ingest/blog",
    tag = "Ingestion",
    operation_id = "ingestBlog",
    summary = "Ingest a blog post with its images",
    description = "Fetches the featured and inline images, uploads them under `blog/{slug}/` \
        and creates the post. An oversized image rejects the request before anything is uploaded. \
        Inline images that fail to fetch are skipped and the post is stored as `needs_attention`. \
        Requires an API key with the `blog_ingest` scope in `x-api-key`.",
    request_body = BlogIngestRequest,
    responses(
        (status = 200, description = "Post created", body = BlogIngestResponse),
        (status = 400, description = "Validation error or image too large (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing or invalid API key (UNAUTHORIZED)", body = ErrorBody),
        (status = 409, description = "Slug already exists (CONFLICT)", body = ErrorBody),
        (status = 429, description = "Rate limited (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("api_key" = [])),
)]
#[instrument(skip_all, fields(correlation_id = %correlation_id))]
pub async fn ingest_blog(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    payload: Result<AppJson<Value>, AppError>,
) -> Result<Json<BlogIngestResponse>, AppError> {
    let actor = authorize(
        &state,
        &CredentialVerifier::BLOG_INGEST,
        &headers,
        &correlation_id,
        &client,
        RejectionAudit {
            action: "blog.ingest.rejected",
            entity_type: "blog_post",
            actor_type: ActorType::ApiKey,
        },
    )
    .await?;

    enforce_rate_limit(&state, &format!("blog:{}", actor.id))?;

    let AppJson(body) = payload?;
    let payload = BlogPayload::from_value(&body, state.config.ingestion.max_images)
        .map_err(AppError::Validation)?;
    let slug = payload.slug.clone();

    match run_blog(Pipeline::from_state(&state), payload, &actor).await {
        Ok(ingested) => {
            state
                .audit
                .record(
                    AuditEntry::by(&actor, "blog.ingest.success", "blog_post", AuditOutcome::Success)
                        .entity_id(ingested.record.id)
                        .correlation_id(correlation_id.as_str())
                        .client(&client)
                        .detail(with_slug(ingested.outcome.audit_detail(), &slug)),
                )
                .await;

            tracing::info!(
                id = %ingested.record.id,
                slug = %slug,
                inline = ingested.inline_paths.len(),
                "Blog post ingested"
            );

            Ok(Json(BlogIngestResponse {
                id: ingested.record.id,
                status: ingested.status,
                featured_image_path: ingested.featured_image_path,
                inline_paths: ingested.inline_paths,
                correlation_id: correlation_id.0,
            }))
        }
        Err(e) => {
            audit_failure(
                &state,
                &actor,
                "blog.ingest.failed",
                "blog_post",
                &correlation_id,
                &client,
                &e,
            )
            .await;
            Err(e)
        }
    }
}

fn with_source(mut detail: Value, source_url: &str) -> Value {
    detail["sourceUrl"] = json!(source_url);
    detail
}

fn with_slug(mut detail: Value, slug: &str) -> Value {
    detail["slug"] = json!(slug);
    detail
}
