use chrono::Utc;
use common::storage::{UploadedObject, upload_content_addressed};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
};
use serde_json::Value;
use uuid::Uuid;

use super::{ContentStatus, IngestionOutcome, Pipeline};
use crate::auth::{Actor, ActorType};
use crate::entity::blog_post;
use crate::error::AppError;
use crate::fetch::FetchedImage;
use crate::utils::media::{Association, MediaSource, NewMedia, upsert_media};

const REQUIRED_FIELDS: [&str; 6] = ["title", "slug", "summary", "body", "tags", "images"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub url: String,
    pub alt: String,
}

/// A structurally valid blog ingestion payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogPayload {
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub body: String,
    pub tags: Vec<String>,
    pub images: Vec<InlineImage>,
    pub featured_image: Option<String>,
    pub publish: bool,
}

impl BlogPayload {
    /// Validate a raw JSON body, reporting the first offending field.
    ///
    /// `max_images` caps how many inline images may be declared.
    pub fn from_value(body: &Value, max_images: usize) -> Result<Self, String> {
        for field in REQUIRED_FIELDS {
            if body.get(field).is_none_or(Value::is_null) {
                return Err(format!("Missing {field}"));
            }
        }

        let text = |field: &str| -> Result<String, String> {
            body[field]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("{field} must be a string"))
        };

        let Some(tags) = body["tags"].as_array() else {
            return Err("tags must be an array".into());
        };
        let Some(images) = body["images"].as_array() else {
            return Err("images must be an array".into());
        };
        if images.len() > max_images {
            return Err(format!("images must contain at most {max_images} items"));
        }

        let tags = tags
            .iter()
            .map(|t| t.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| "tags must contain only strings".to_string())?;

        let images = images
            .iter()
            .map(|img| {
                let field = |key: &str| {
                    img.get(key)
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                };
                match (field("url"), field("alt")) {
                    (Some(url), Some(alt)) => Some(InlineImage { url, alt }),
                    _ => None,
                }
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| "images items require url and alt".to_string())?;

        let slug = text("slug")?;
        if slug.is_empty()
            || !slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err("slug may only contain letters, digits, '-' and '_'".into());
        }

        let featured_image = match body.get("featuredImage") {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) if url.is_empty() => None,
            Some(Value::String(url)) => Some(url.clone()),
            Some(_) => return Err("featuredImage must be a string".into()),
        };

        Ok(Self {
            title: text("title")?,
            slug,
            summary: text("summary")?,
            body: text("body")?,
            tags,
            images,
            featured_image,
            publish: body.get("publish").and_then(Value::as_bool) != Some(false),
        })
    }
}

#[derive(Debug)]
pub struct BlogIngested {
    pub record: blog_post::Model,
    pub status: ContentStatus,
    pub featured_image_path: Option<String>,
    pub inline_paths: Vec<String>,
    pub outcome: IngestionOutcome,
}

struct StagedUpload {
    uploaded: UploadedObject,
    content_type: String,
    alt: String,
}

/// Fetch, persist and upload one blog post.
///
/// Every declared image is fetched before anything is written, so an oversized
/// image rejects the request with no side effects. The post row is inserted
/// before any upload, so a request that loses the slug race never touches the
/// winner's objects. Inline images that fail to fetch or upload are skipped
/// and mark the post `needs_attention`.
pub async fn ingest_blog(
    pipeline: Pipeline<'_>,
    payload: BlogPayload,
    actor: &Actor,
) -> Result<BlogIngested, AppError> {
    let taken = blog_post::Entity::find()
        .filter(blog_post::Column::Slug.eq(&payload.slug))
        .count(pipeline.db)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict("Slug already exists".into()));
    }

    let mut outcome = IngestionOutcome::default();

    let featured = match &payload.featured_image {
        Some(url) => match pipeline.fetcher.fetch_image(url, pipeline.max_image_bytes).await {
            Ok(image) => Some(image),
            Err(e) if e.is_too_large() => {
                return Err(AppError::Validation("Featured image exceeds limit".into()));
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Featured image fetch failed");
                return Err(AppError::Validation("Failed to fetch featured image".into()));
            }
        },
        None => None,
    };

    let mut inline: Vec<(usize, &InlineImage, FetchedImage)> = Vec::new();
    for (idx, image) in payload.images.iter().enumerate() {
        let fetched = pipeline
            .fetcher
            .fetch_image(&image.url, pipeline.max_image_bytes)
            .await;
        match fetched {
            Err(e) if e.is_too_large() => {
                return Err(AppError::Validation("Inline image exceeds limit".into()));
            }
            other => {
                if let Some(bytes) = outcome.absorb("inline_image", &image.url, other) {
                    inline.push((idx + 1, image, bytes));
                }
            }
        }
    }

    let requested = if payload.publish {
        ContentStatus::Published
    } else {
        ContentStatus::Draft
    };
    let inserted_status = outcome.status(requested);
    let now = Utc::now();
    let api_key_id = match actor.actor_type {
        ActorType::ApiKey => Uuid::parse_str(&actor.id).ok(),
        _ => None,
    };

    let post = blog_post::ActiveModel {
        id: Set(Uuid::now_v7()),
        slug: Set(payload.slug.clone()),
        title: Set(payload.title.clone()),
        summary: Set(payload.summary),
        body: Set(payload.body),
        tags: Set(Value::from(payload.tags)),
        status: Set(inserted_status.as_str().to_string()),
        published_at: Set((inserted_status == ContentStatus::Published).then_some(now)),
        featured_image_id: Set(None),
        inline_media_ids: Set(Value::Array(vec![])),
        source: Set("api".into()),
        api_key_id: Set(api_key_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let record = post.insert(pipeline.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Slug race caught on insert");
            AppError::Conflict("Slug already exists".into())
        }
        _ => AppError::from(e),
    })?;

    let prefix = format!("blog/{}", payload.slug);

    let featured_upload = match featured {
        Some(image) => {
            let upload = upload_content_addressed(
                pipeline.store,
                &image.bytes,
                &image.content_type,
                &prefix,
                Some("featured"),
            )
            .await;
            outcome
                .absorb("featured_upload", &prefix, upload)
                .map(|uploaded| StagedUpload {
                    uploaded,
                    content_type: image.content_type,
                    alt: payload.title.clone(),
                })
        }
        None => None,
    };

    let mut inline_uploads = Vec::with_capacity(inline.len());
    for (position, image, fetched) in inline {
        let name = format!("inline-{position}");
        let upload = upload_content_addressed(
            pipeline.store,
            &fetched.bytes,
            &fetched.content_type,
            &prefix,
            Some(&name),
        )
        .await;
        if let Some(uploaded) = outcome.absorb("inline_upload", &image.url, upload) {
            inline_uploads.push(StagedUpload {
                uploaded,
                content_type: fetched.content_type,
                alt: image.alt.clone(),
            });
        }
    }

    let status = outcome.status(requested);
    let featured_image_path = featured_upload.as_ref().map(|s| s.uploaded.path.clone());
    let inline_paths: Vec<String> = inline_uploads
        .iter()
        .map(|s| s.uploaded.path.clone())
        .collect();

    let featured_image_id = match featured_upload {
        Some(staged) => Some(record_media(pipeline, staged, record.id).await?.id),
        None => None,
    };
    let mut inline_media_ids = Vec::with_capacity(inline_uploads.len());
    for staged in inline_uploads {
        inline_media_ids.push(record_media(pipeline, staged, record.id).await?.id);
    }

    let degraded = status != inserted_status;
    let record = if degraded || featured_image_id.is_some() || !inline_media_ids.is_empty() {
        let mut active: blog_post::ActiveModel = record.into();
        active.featured_image_id = Set(featured_image_id);
        active.inline_media_ids = Set(Value::from(
            inline_media_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>(),
        ));
        if degraded {
            // An upload failed after the post went in as published or draft.
            active.status = Set(status.as_str().to_string());
            active.published_at = Set(None);
        }
        active.updated_at = Set(Utc::now());
        active.update(pipeline.db).await?
    } else {
        record
    };

    Ok(BlogIngested {
        record,
        status,
        featured_image_path,
        inline_paths,
        outcome,
    })
}

async fn record_media(
    pipeline: Pipeline<'_>,
    staged: StagedUpload,
    post_id: Uuid,
) -> Result<crate::entity::media_asset::Model, AppError> {
    let media = upsert_media(
        pipeline.db,
        NewMedia {
            url: pipeline.store.public_url(&staged.uploaded.path),
            storage_path: staged.uploaded.path,
            alt_text: Some(staged.alt),
            caption: None,
            mime_type: Some(staged.content_type),
            size_bytes: i64::try_from(staged.uploaded.size).ok(),
            checksum: Some(staged.uploaded.checksum.to_hex()),
            source: MediaSource::Upload,
            association: Some(Association::Blog(post_id)),
        },
    )
    .await?;
    Ok(media)
}
