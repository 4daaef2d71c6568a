use std::sync::Arc;

use common::storage::ObjectStore;
use sea_orm::DatabaseConnection;

use crate::audit::AuditLogger;
use crate::config::AppConfig;
use crate::fetch::RemoteFetcher;
use crate::rate_limit::RateLimiter;

/// Shared handles, constructed once at startup and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub object_store: Arc<dyn ObjectStore>,
    pub fetcher: Arc<dyn RemoteFetcher>,
    pub rate_limiter: Arc<RateLimiter>,
    pub audit: AuditLogger,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        object_store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn RemoteFetcher>,
    ) -> Self {
        Self {
            audit: AuditLogger::new(db.clone()),
            rate_limiter: Arc::new(RateLimiter::new()),
            db,
            config,
            object_store,
            fetcher,
        }
    }
}
