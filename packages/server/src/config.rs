use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Require TLS for the Postgres connection.
    pub ssl: bool,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Connection URL with `sslmode=require` appended when SSL is enabled.
    pub fn connection_url(&self) -> String {
        if !self.ssl || self.url.contains("sslmode=") {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}sslmode=require", self.url, separator)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Filesystem,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: String,
    pub public_base_url: Option<String>,
    /// Root directory for the filesystem backend.
    pub local_dir: String,
    pub max_upload_bytes: usize,
    pub presign_expiry_secs: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Filesystem,
            endpoint: None,
            region: "us-east-1".into(),
            access_key: None,
            secret_key: None,
            bucket: "public-media".into(),
            public_base_url: None,
            local_dir: "./data/media".into(),
            max_upload_bytes: 5 * 1024 * 1024,
            presign_expiry_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 30,
            window_ms: 60_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionConfig {
    /// Base URL of the headless-browser screenshot service.
    pub screenshot_url: String,
    pub screenshot_api_key: Option<String>,
    pub app_catalog_base_url: String,
    pub app_catalog_country: String,
    pub fetch_timeout_ms: u64,
    pub screenshot_timeout_ms: u64,
    pub fetch_retries: u8,
    pub max_image_bytes: usize,
    /// Most inline images one blog payload may declare.
    pub max_images: usize,
    pub rate_limit: RateLimitConfig,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            screenshot_url: "https://chrome.browserless.io".into(),
            screenshot_api_key: None,
            app_catalog_base_url: "https://itunes.apple.com/lookup".into(),
            app_catalog_country: "us".into(),
            fetch_timeout_ms: 8_000,
            screenshot_timeout_ms: 10_000,
            fetch_retries: 1,
            max_image_bytes: 2_000_000,
            max_images: 20,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Shared password for the admin panel login.
    pub admin_password: String,
    /// HMAC secret for admin session tokens.
    pub session_secret: String,
    /// Shared secret for service-to-service calls. Disabled when unset.
    pub internal_secret: Option<String>,
    pub session_ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub ingestion: IngestionConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("ATELIER_CONFIG").unwrap_or_else(|_| "config/config".into());
        let storage = StorageConfig::default();
        let ingestion = IngestionConfig::default();

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.ssl", false)?
            .set_default("database.max_connections", 20)?
            .set_default("storage.backend", "filesystem")?
            .set_default("storage.region", storage.region)?
            .set_default("storage.bucket", storage.bucket)?
            .set_default("storage.local_dir", storage.local_dir)?
            .set_default("storage.max_upload_bytes", storage.max_upload_bytes as u64)?
            .set_default("storage.presign_expiry_secs", storage.presign_expiry_secs)?
            .set_default("ingestion.screenshot_url", ingestion.screenshot_url)?
            .set_default("ingestion.app_catalog_base_url", ingestion.app_catalog_base_url)?
            .set_default("ingestion.app_catalog_country", ingestion.app_catalog_country)?
            .set_default("ingestion.fetch_timeout_ms", ingestion.fetch_timeout_ms)?
            .set_default("ingestion.screenshot_timeout_ms", ingestion.screenshot_timeout_ms)?
            .set_default("ingestion.fetch_retries", ingestion.fetch_retries)?
            .set_default("ingestion.max_image_bytes", ingestion.max_image_bytes as u64)?
            .set_default("ingestion.max_images", ingestion.max_images as u64)?
            .set_default("ingestion.rate_limit.limit", ingestion.rate_limit.limit)?
            .set_default("ingestion.rate_limit.window_ms", ingestion.rate_limit.window_ms)?
            .set_default("auth.session_ttl_hours", 24)?
            // Load from config/config.toml (or $ATELIER_CONFIG)
            .add_source(File::with_name(&path).required(false))
            // Override from environment (e.g., ATELIER__STORAGE__BUCKET)
            .add_source(
                Environment::with_prefix("ATELIER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
