pub mod audit;
pub mod auth;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod handlers;
pub mod ingestion;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{API_KEY_HEADER, INTERNAL_SECRET_HEADER};
use crate::config::CorsConfig;
use crate::extractors::correlation::{self, CORRELATION_HEADER};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Atelier Content Ingestion API",
        version = "1.0.0",
        description = "Ingests portfolio items and blog posts, stores their media and records an audit trail"
    ),
    tags(
        (name = "Ingestion", description = "Portfolio and blog ingestion pipelines"),
        (name = "Media", description = "Image uploads, presigned uploads and media records"),
        (name = "Admin", description = "Admin session and content deletion"),
        (name = "Health", description = "Liveness"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static(INTERNAL_SECRET_HEADER),
            HeaderName::from_static(CORRELATION_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static(CORRELATION_HEADER),
            header::RETRY_AFTER,
        ])
        .max_age(Duration::from_secs(config.max_age));

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        // Session cookies only travel to explicitly listed origins.
        layer
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes::api_routes(&state.config))
        .split_for_parts();

    let cors = cors_layer(&state.config.server.cors);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(axum::middleware::from_fn(correlation::propagate))
        .layer(cors)
}
