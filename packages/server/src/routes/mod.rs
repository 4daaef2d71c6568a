use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::health::health))
        .merge(ingest_routes())
        .merge(media_routes(config))
        .merge(admin_routes())
}

fn ingest_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::ingest::ingest_portfolio))
        .routes(routes!(handlers::ingest::ingest_blog))
}

fn media_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let uploads = OpenApiRouter::new()
        .routes(routes!(handlers::media::upload_media))
        .routes(routes!(handlers::media::proxy_upload))
        .layer(handlers::media::upload_body_limit(
            config.storage.max_upload_bytes,
        ));

    OpenApiRouter::new()
        .routes(routes!(handlers::media::list_media))
        .routes(routes!(handlers::media::presign_upload))
        .routes(routes!(handlers::media::finalize_upload))
        .routes(routes!(handlers::media::delete_media))
        .merge(uploads)
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::admin::login))
        .routes(routes!(handlers::admin::delete_portfolio_item))
        .routes(routes!(handlers::admin::delete_blog_post))
}
