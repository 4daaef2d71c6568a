use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::IntoResponse;
use sea_orm::*;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditOutcome};
use crate::auth::keys::secrets_match;
use crate::auth::session::{self, ADMIN_ROLE, SESSION_COOKIE};
use crate::auth::{ActorType, CredentialVerifier, RejectionAudit, authorize};
use crate::entity::{blog_post, media_asset, portfolio_item};
use crate::error::{AppError, ErrorBody};
use crate::extractors::client::ClientInfo;
use crate::extractors::correlation::CorrelationId;
use crate::extractors::json::AppJson;
use crate::models::admin::{LoginRequest, LoginResponse};
use crate::models::shared::SuccessResponse;
use crate::state::AppState;
use crate::utils::media::remove_objects_best_effort;

/// Subject of sessions issued by the password login.
const ADMIN_SUBJECT: &str = "admin";

#[utoipa::path(
    post,
    path = "/admin/login",
    tag = "Admin",
    operation_id = "adminLogin",
    summary = "Exchange the admin password for a session",
    description = "Sets an HttpOnly `admin_session` cookie and returns the same token for bearer use.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing password (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong password (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip_all, fields(correlation_id = %correlation_id))]
pub async fn login(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".into()))?;

    let auth = &state.config.auth;
    if auth.admin_password.is_empty() || !secrets_match(&password, &auth.admin_password) {
        tracing::warn!("Admin login rejected");
        state
            .audit
            .record(
                AuditEntry::new(
                    "unknown",
                    ActorType::User,
                    "admin.login.rejected",
                    "session",
                    AuditOutcome::Failure,
                )
                .correlation_id(correlation_id.as_str())
                .client(&client),
            )
            .await;
        return Err(AppError::Unauthorized("Invalid password".into()));
    }

    let token = session::sign(
        &auth.session_secret,
        ADMIN_SUBJECT,
        &[ADMIN_ROLE],
        auth.session_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("Session sign error: {e}")))?;

    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        auth.session_ttl_hours.saturating_mul(3600)
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(format!("Session cookie error: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, cookie);

    Ok((
        headers,
        Json(LoginResponse {
            success: true,
            token,
        }),
    ))
}

fn admin_rejection(entity_type: &'static str) -> RejectionAudit<'static> {
    RejectionAudit {
        action: "admin.delete.rejected",
        entity_type,
        actor_type: ActorType::User,
    }
}

/// Remove backing objects best-effort, then the media rows and the record in one transaction.
async fn delete_with_media<E>(
    state: &AppState,
    media_filter: Condition,
    mut paths: Vec<String>,
    record_id: Uuid,
) -> Result<(), AppError>
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
    let assets = media_asset::Entity::find()
        .filter(media_filter.clone())
        .all(&state.db)
        .await?;
    for asset in assets {
        if !paths.contains(&asset.storage_path) {
            paths.push(asset.storage_path);
        }
    }

    remove_objects_best_effort(state.object_store.as_ref(), &paths).await;

    let txn = state.db.begin().await?;
    media_asset::Entity::delete_many()
        .filter(media_filter)
        .exec(&txn)
        .await?;
    E::delete_by_id(record_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

#[utoipa::path(
    delete,
    path = "/admin/portfolio/{id}",
    tag = "Admin",
    operation_id = "deletePortfolioItem",
    summary = "Delete a portfolio item and its media",
    params(("id" = Uuid, Path, description = "Portfolio item ID")),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 401, description = "Unauthorized (UNAUTHORIZED)", body = ErrorBody),
        (status = 403, description = "Forbidden (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, correlation_id, client, headers), fields(correlation_id = %correlation_id))]
pub async fn delete_portfolio_item(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    let actor = authorize(
        &state,
        &CredentialVerifier::ADMIN,
        &headers,
        &correlation_id,
        &client,
        admin_rejection("portfolio_item"),
    )
    .await?;

    let item = portfolio_item::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Portfolio item not found".into()))?;

    delete_with_media::<portfolio_item::Entity>(
        &state,
        Condition::all().add(media_asset::Column::PortfolioItemId.eq(id)),
        item.screenshot_path.into_iter().collect(),
        id,
    )
    .await?;

    state
        .audit
        .record(
            AuditEntry::by(&actor, "portfolio.delete", "portfolio_item", AuditOutcome::Success)
                .entity_id(id)
                .correlation_id(correlation_id.as_str())
                .client(&client)
                .detail(json!({ "sourceUrl": item.source_url })),
        )
        .await;

    Ok(Json(SuccessResponse::ok()))
}

#[utoipa::path(
    delete,
    path = "/admin/blog/{id}",
    tag = "Admin",
    operation_id = "deleteBlogPost",
    summary = "Delete a blog post and its media",
    params(("id" = Uuid, Path, description = "Blog post ID")),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 401, description = "Unauthorized (UNAUTHORIZED)", body = ErrorBody),
        (status = 403, description = "Forbidden (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, correlation_id, client, headers), fields(correlation_id = %correlation_id))]
pub async fn delete_blog_post(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    let actor = authorize(
        &state,
        &CredentialVerifier::ADMIN,
        &headers,
        &correlation_id,
        &client,
        admin_rejection("blog_post"),
    )
    .await?;

    let post = blog_post::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog post not found".into()))?;

    delete_with_media::<blog_post::Entity>(
        &state,
        Condition::all().add(media_asset::Column::BlogPostId.eq(id)),
        Vec::new(),
        id,
    )
    .await?;

    state
        .audit
        .record(
            AuditEntry::by(&actor, "blog.delete", "blog_post", AuditOutcome::Success)
                .entity_id(id)
                .correlation_id(correlation_id.as_str())
                .client(&client)
                .detail(json!({ "slug": post.slug })),
        )
        .await;

    Ok(Json(SuccessResponse::ok()))
}
