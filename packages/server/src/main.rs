use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use common::storage::ObjectStore;
use common::storage::filesystem::FilesystemObjectStore;
use common::storage::s3::{S3ObjectStore, S3Settings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use atelier::config::{AppConfig, StorageBackend, StorageConfig};
use atelier::fetch::{FetcherSettings, HttpFetcher};
use atelier::state::AppState;

async fn build_object_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::S3 => {
            let (Some(endpoint), Some(access_key), Some(secret_key)) = (
                config.endpoint.clone(),
                config.access_key.clone(),
                config.secret_key.clone(),
            ) else {
                bail!("storage.backend = s3 requires storage.endpoint, access_key and secret_key");
            };
            let store = S3ObjectStore::connect(S3Settings {
                endpoint,
                region: config.region.clone(),
                bucket: config.bucket.clone(),
                access_key,
                secret_key,
                public_base_url: config.public_base_url.clone(),
            })
            .await
            .context("Failed to connect to object storage")?;
            Ok(Arc::new(store))
        }
        StorageBackend::Filesystem => {
            let store = FilesystemObjectStore::new(
                PathBuf::from(&config.local_dir),
                config.bucket.clone(),
                config.public_base_url.clone(),
            )
            .await
            .context("Failed to initialize filesystem object store")?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    if config.auth.session_secret.is_empty() {
        bail!("auth.session_secret must be set");
    }
    if config.auth.admin_password.is_empty() {
        warn!("auth.admin_password is empty; admin login is disabled");
    }
    if config.ingestion.screenshot_api_key.is_none() {
        warn!("ingestion.screenshot_api_key is not set; portfolio items will need attention");
    }

    let db = atelier::database::init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    atelier::seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;
    info!("Database ready");

    let object_store = build_object_store(&config.storage).await?;
    info!(
        backend = ?config.storage.backend,
        bucket = object_store.bucket(),
        "Object store ready"
    );

    let fetcher = HttpFetcher::new(FetcherSettings::from(&config.ingestion))
        .context("Failed to build HTTP client")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(db, config, object_store, Arc::new(fetcher));
    let app = atelier::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
