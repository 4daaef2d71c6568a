use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::storage::{ContentHash, disambiguated_key, validate_object_key};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use serde_json::json;
use tracing::instrument;

use super::audit_failure;
use crate::audit::{AuditEntry, AuditOutcome};
use crate::auth::{Actor, ActorType, CredentialVerifier, RejectionAudit, authorize};
use crate::entity::media_asset;
use crate::error::{AppError, ErrorBody};
use crate::extractors::client::ClientInfo;
use crate::extractors::correlation::CorrelationId;
use crate::extractors::json::AppJson;
use crate::models::media::*;
use crate::models::shared::{SuccessResponse, escape_like, non_blank};
use crate::state::AppState;
use crate::utils::media::{
    Association, MediaSource, NewMedia, association_exists, is_allowed_image_type,
    remove_objects_best_effort, upsert_media,
};

const MEDIA_ENTITY: &str = "media_asset";
const DEFAULT_PREFIX: &str = "uploads";
const PRESIGN_PURPOSES: &[&str] = &["portfolio", "blog", DEFAULT_PREFIX];

/// Body limit for the upload routes: base64 inflates payloads by a third, plus form overhead.
pub fn upload_body_limit(max_upload_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_upload_bytes.saturating_mul(2).saturating_add(64 * 1024))
}

fn rejection(action: &'static str) -> RejectionAudit<'static> {
    RejectionAudit {
        action,
        entity_type: MEDIA_ENTITY,
        actor_type: ActorType::User,
    }
}

/// An image received through either upload endpoint, not yet stored.
struct IncomingImage {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
    alt_text: String,
    caption: Option<String>,
    association: Option<Association>,
}

fn check_type_and_size(state: &AppState, content_type: &str, size: u64) -> Result<(), AppError> {
    if !is_allowed_image_type(content_type) {
        return Err(AppError::UnsupportedMediaType(format!(
            "Unsupported content type: {content_type}"
        )));
    }
    let max = state.config.storage.max_upload_bytes as u64;
    if size > max {
        return Err(AppError::PayloadTooLarge(format!(
            "File exceeds the {max} byte limit"
        )));
    }
    Ok(())
}

/// Reject an association whose portfolio item or blog post does not exist.
async fn ensure_associated_record(
    state: &AppState,
    association: Option<Association>,
) -> Result<(), AppError> {
    match association {
        Some(association) if !association_exists(&state.db, association).await? => {
            Err(AppError::NotFound(association.missing_message().into()))
        }
        _ => Ok(()),
    }
}

/// Accept both bare base64 and `data:<type>;base64,<payload>` URLs.
fn decode_base64(data: &str) -> Result<Vec<u8>, AppError> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|_| AppError::Validation("data must be base64-encoded".into()))
}

async fn store_image(
    state: &AppState,
    actor: &Actor,
    image: IncomingImage,
    action: &str,
    correlation_id: &CorrelationId,
    client: &ClientInfo,
) -> Result<media_asset::Model, AppError> {
    let media = match persist_image(state, image).await {
        Ok(media) => media,
        Err(e) => {
            let failed = format!("{action}.failed");
            audit_failure(state, actor, &failed, MEDIA_ENTITY, correlation_id, client, &e).await;
            return Err(e);
        }
    };

    state
        .audit
        .record(
            AuditEntry::by(actor, action, MEDIA_ENTITY, AuditOutcome::Success)
                .entity_id(media.id)
                .correlation_id(correlation_id.as_str())
                .client(client)
                .detail(json!({
                    "objectKey": media.storage_path,
                    "sizeBytes": media.size_bytes,
                })),
        )
        .await;

    tracing::info!(key = %media.storage_path, size = ?media.size_bytes, "Media uploaded");
    Ok(media)
}

/// Write the object, then its row; the object is removed again if the row write fails.
async fn persist_image(
    state: &AppState,
    image: IncomingImage,
) -> Result<media_asset::Model, AppError> {
    let prefix = image
        .association
        .map(Association::kind)
        .unwrap_or(DEFAULT_PREFIX);
    let key = disambiguated_key(prefix, &image.filename);
    ensure_associated_record(state, image.association).await?;

    state
        .object_store
        .put(&key, &image.bytes, &image.content_type)
        .await?;

    let recorded = upsert_media(
        &state.db,
        NewMedia {
            url: state.object_store.public_url(&key),
            storage_path: key.clone(),
            alt_text: Some(image.alt_text),
            caption: image.caption,
            mime_type: Some(image.content_type),
            size_bytes: i64::try_from(image.bytes.len()).ok(),
            checksum: Some(ContentHash::compute(&image.bytes).to_hex()),
            source: MediaSource::Upload,
            association: image.association,
        },
    )
    .await;
    match recorded {
        Ok(media) => Ok(media),
        Err(e) => {
            remove_objects_best_effort(state.object_store.as_ref(), std::slice::from_ref(&key))
                .await;
            Err(e.into())
        }
    }
}

#[utoipa::path(
    post,
    path = "/media/upload",
    tag = "Media",
    operation_id = "uploadMedia",
    summary = "Upload a base64-encoded image",
    description = "Stores a PNG, JPEG or WebP image and records it as a media asset. \
        Accepts an internal secret, a `media_upload` API key or an admin session.",
    request_body = UploadMediaRequest,
    responses(
        (status = 201, description = "Media stored", body = MediaAssetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Associated record not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "Image too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "Disallowed content type (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
    ),
    security(("jwt" = []), ("api_key" = [])),
)]
#[instrument(skip_all, fields(correlation_id = %correlation_id))]
pub async fn upload_media(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    payload: Result<AppJson<UploadMediaRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let actor = authorize(
        &state,
        &CredentialVerifier::MEDIA,
        &headers,
        &correlation_id,
        &client,
        rejection("media.upload.rejected"),
    )
    .await?;

    let AppJson(payload) = payload?;
    let content_type = payload.content_type.trim().to_ascii_lowercase();
    // Reject on the declared type before decoding anything.
    check_type_and_size(&state, &content_type, 0)?;
    let alt_text = require_alt_text(&payload.alt_text)?;
    let association =
        parse_association(payload.associated_type.as_deref(), payload.associated_id)?;

    let bytes = decode_base64(&payload.data)?;
    if bytes.is_empty() {
        return Err(AppError::Validation("data must not be empty".into()));
    }
    check_type_and_size(&state, &content_type, bytes.len() as u64)?;

    let media = store_image(
        &state,
        &actor,
        IncomingImage {
            filename: payload.filename,
            content_type,
            bytes,
            alt_text,
            caption: non_blank(payload.caption),
            association,
        },
        "media.upload",
        &correlation_id,
        &client,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(MediaAssetResponse::from(media))))
}

#[utoipa::path(
    post,
    path = "/media/proxy",
    tag = "Media",
    operation_id = "proxyUploadMedia",
    summary = "Upload an image as multipart form data",
    description = "Multipart variant of `/media/upload`. Fields: `file` (required), `altText` (required), \
        `caption`, `associatedType`, `associatedId`.",
    request_body(content_type = "multipart/form-data", description = "Image file with metadata"),
    responses(
        (status = 201, description = "Media stored", body = MediaAssetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Associated record not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "Image too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "Disallowed content type (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
    ),
    security(("jwt" = []), ("api_key" = [])),
)]
#[instrument(skip_all, fields(correlation_id = %correlation_id))]
pub async fn proxy_upload(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let actor = authorize(
        &state,
        &CredentialVerifier::MEDIA,
        &headers,
        &correlation_id,
        &client,
        rejection("media.upload.proxy.rejected"),
    )
    .await?;

    let mut multipart =
        multipart.map_err(|e| AppError::Validation(format!("Multipart error: {}", e.body_text())))?;

    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut alt_text: Option<String> = None;
    let mut caption: Option<String> = None;
    let mut associated_type: Option<String> = None;
    let mut associated_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .map(|c| c.to_ascii_lowercase())
                    .or_else(|| {
                        mime_guess::from_path(&filename)
                            .first()
                            .map(|m| m.to_string())
                    })
                    .unwrap_or_default();
                check_type_and_size(&state, &content_type, 0)?;
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            Some(name @ ("altText" | "caption" | "associatedType" | "associatedId")) => {
                let name = name.to_string();
                let text = field.text().await.map_err(multipart_error)?;
                match name.as_str() {
                    "altText" => alt_text = Some(text),
                    "caption" => caption = Some(text),
                    "associatedType" => associated_type = Some(text),
                    _ => associated_id = Some(text),
                }
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    check_type_and_size(&state, &content_type, bytes.len() as u64)?;
    if bytes.is_empty() {
        return Err(AppError::Validation("file must not be empty".into()));
    }

    let alt_text = require_alt_text(alt_text.as_deref().unwrap_or_default())?;
    let associated_id = non_blank(associated_id)
        .map(|id| {
            uuid::Uuid::parse_str(&id)
                .map_err(|_| AppError::Validation("associatedId must be a UUID".into()))
        })
        .transpose()?;
    let association = parse_association(associated_type.as_deref(), associated_id)?;

    let media = store_image(
        &state,
        &actor,
        IncomingImage {
            filename,
            content_type,
            bytes,
            alt_text,
            caption: non_blank(caption),
            association,
        },
        "media.upload.proxy",
        &correlation_id,
        &client,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(MediaAssetResponse::from(media))))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Multipart error: {}", e.body_text()))
    }
}

#[utoipa::path(
    post,
    path = "/media/presign",
    tag = "Media",
    operation_id = "presignMediaUpload",
    summary = "Issue a direct-upload URL",
    description = "Returns a time-boxed URL accepting a `PUT` of the object, to be followed by \
        `/media/finalize`. Admin session only. Backends without presigning return 503.",
    request_body = PresignRequest,
    responses(
        (status = 200, description = "Upload URL issued", body = PresignResponse),
        (status = 401, description = "Unauthorized (UNAUTHORIZED)", body = ErrorBody),
        (status = 413, description = "Declared size too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 415, description = "Disallowed content type (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
        (status = 503, description = "Presigning unsupported (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all, fields(correlation_id = %correlation_id))]
pub async fn presign_upload(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    payload: Result<AppJson<PresignRequest>, AppError>,
) -> Result<Json<PresignResponse>, AppError> {
    let actor = authorize(
        &state,
        &CredentialVerifier::ADMIN_SESSION,
        &headers,
        &correlation_id,
        &client,
        rejection("media.presign.rejected"),
    )
    .await?;

    let AppJson(payload) = payload?;
    let content_type = payload.content_type.trim().to_ascii_lowercase();
    check_type_and_size(&state, &content_type, payload.size_bytes)?;

    let prefix = match non_blank(payload.purpose) {
        None => DEFAULT_PREFIX.to_string(),
        Some(p) if PRESIGN_PURPOSES.contains(&p.as_str()) => p,
        Some(_) => {
            return Err(AppError::Validation(
                "purpose must be one of: portfolio, blog, uploads".into(),
            ));
        }
    };

    let key = disambiguated_key(&prefix, &payload.filename);
    let expires_in = state.config.storage.presign_expiry_secs;
    let upload_url = state.object_store.presign_put(&key, expires_in).await?;

    state
        .audit
        .record(
            AuditEntry::by(&actor, "media.presign", MEDIA_ENTITY, AuditOutcome::Success)
                .correlation_id(correlation_id.as_str())
                .client(&client)
                .detail(json!({ "objectKey": key, "sizeBytes": payload.size_bytes })),
        )
        .await;

    Ok(Json(PresignResponse {
        upload_url,
        object_key: key,
        expires_in,
    }))
}

#[utoipa::path(
    post,
    path = "/media/finalize",
    tag = "Media",
    operation_id = "finalizeMedia",
    summary = "Record an object uploaded directly to the bucket",
    request_body = FinalizeRequest,
    responses(
        (status = 201, description = "Media recorded", body = MediaAssetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Object or associated record not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = []), ("api_key" = [])),
)]
#[instrument(skip_all, fields(correlation_id = %correlation_id))]
pub async fn finalize_upload(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    payload: Result<AppJson<FinalizeRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let actor = authorize(
        &state,
        &CredentialVerifier::MEDIA,
        &headers,
        &correlation_id,
        &client,
        rejection("media.finalize.rejected"),
    )
    .await?;

    let AppJson(payload) = payload?;
    let media = match record_uploaded_object(&state, payload).await {
        Ok(media) => media,
        Err(e) => {
            audit_failure(
                &state,
                &actor,
                "media.finalize.failed",
                MEDIA_ENTITY,
                &correlation_id,
                &client,
                &e,
            )
            .await;
            return Err(e);
        }
    };

    state
        .audit
        .record(
            AuditEntry::by(&actor, "media.finalize", MEDIA_ENTITY, AuditOutcome::Success)
                .entity_id(media.id)
                .correlation_id(correlation_id.as_str())
                .client(&client)
                .detail(json!({ "objectKey": media.storage_path })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(MediaAssetResponse::from(media))))
}

async fn record_uploaded_object(
    state: &AppState,
    payload: FinalizeRequest,
) -> Result<media_asset::Model, AppError> {
    let key = validate_object_key(payload.object_key.trim())?.to_string();
    let alt_text = require_alt_text(&payload.alt_text)?;
    let association =
        parse_association(payload.associated_type.as_deref(), payload.associated_id)?;
    ensure_associated_record(state, association).await?;

    let meta = state.object_store.stat(&key).await?;
    let mime_type = meta
        .content_type
        .filter(|c| !c.is_empty())
        .or_else(|| mime_guess::from_path(&key).first().map(|m| m.to_string()))
        .unwrap_or_else(|| "application/octet-stream".into());
    let checksum = meta
        .e_tag
        .as_deref()
        .and_then(ContentHash::from_etag)
        .map(|h| h.to_hex());

    let media = upsert_media(
        &state.db,
        NewMedia {
            url: state.object_store.public_url(&key),
            storage_path: key,
            alt_text: Some(alt_text),
            caption: non_blank(payload.caption),
            mime_type: Some(mime_type),
            size_bytes: i64::try_from(meta.size).ok(),
            checksum,
            source: MediaSource::Upload,
            association,
        },
    )
    .await?;
    Ok(media)
}

#[utoipa::path(
    post,
    path = "/media/delete",
    tag = "Media",
    operation_id = "deleteMedia",
    summary = "Delete a stored object and its media rows",
    description = "Object removal is best-effort: the rows are deleted even if the bucket delete fails.",
    request_body = DeleteMediaRequest,
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (UNAUTHORIZED)", body = ErrorBody),
        (status = 403, description = "Forbidden (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all, fields(correlation_id = %correlation_id))]
pub async fn delete_media(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    payload: Result<AppJson<DeleteMediaRequest>, AppError>,
) -> Result<Json<SuccessResponse>, AppError> {
    let actor = authorize(
        &state,
        &CredentialVerifier::ADMIN,
        &headers,
        &correlation_id,
        &client,
        rejection("media.delete.rejected"),
    )
    .await?;

    let AppJson(payload) = payload?;
    let key = validate_object_key(payload.object_key.trim())?.to_string();

    let removed_objects =
        remove_objects_best_effort(state.object_store.as_ref(), std::slice::from_ref(&key)).await;
    let removed_rows = match media_asset::Entity::delete_many()
        .filter(media_asset::Column::StoragePath.eq(&key))
        .exec(&state.db)
        .await
    {
        Ok(result) => result.rows_affected,
        Err(e) => {
            let e = AppError::from(e);
            audit_failure(
                &state,
                &actor,
                "media.delete.failed",
                MEDIA_ENTITY,
                &correlation_id,
                &client,
                &e,
            )
            .await;
            return Err(e);
        }
    };

    state
        .audit
        .record(
            AuditEntry::by(&actor, "media.delete", MEDIA_ENTITY, AuditOutcome::Success)
                .correlation_id(correlation_id.as_str())
                .client(&client)
                .detail(json!({
                    "objectKey": key,
                    "removedObjects": removed_objects,
                    "removedRows": removed_rows,
                })),
        )
        .await;

    Ok(Json(SuccessResponse::ok()))
}

#[utoipa::path(
    get,
    path = "/media",
    tag = "Media",
    operation_id = "listMedia",
    summary = "List media assets, newest first",
    params(MediaListQuery),
    responses(
        (status = 200, description = "Media assets", body = MediaListResponse),
        (status = 401, description = "Unauthorized (UNAUTHORIZED)", body = ErrorBody),
    ),
    security(("jwt" = []), ("api_key" = [])),
)]
#[instrument(skip_all, fields(correlation_id = %correlation_id))]
pub async fn list_media(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client: ClientInfo,
    headers: HeaderMap,
    Query(query): Query<MediaListQuery>,
) -> Result<Json<MediaListResponse>, AppError> {
    authorize(
        &state,
        &CredentialVerifier::MEDIA,
        &headers,
        &correlation_id,
        &client,
        rejection("media.list.rejected"),
    )
    .await?;

    let mut select = media_asset::Entity::find();

    if let Some(ref search) = query.q {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(media_asset::Column::AltText)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(media_asset::Column::StoragePath)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    let data = select
        .order_by_desc(media_asset::Column::CreatedAt)
        .order_by_desc(media_asset::Column::Id)
        .limit(Some(query.limit()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(MediaAssetResponse::from)
        .collect();

    Ok(Json(MediaListResponse { data }))
}
