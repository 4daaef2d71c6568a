//! Outbound HTTP: image downloads, screenshot capture and app-catalog lookups.
//!
//! Every call carries its own timeout and at most one retry. Callers treat any
//! [`FetchError`] as a per-asset failure rather than a request failure.

pub mod app_catalog;
mod http;

use async_trait::async_trait;
use serde::Serialize;

pub use http::{FetcherSettings, HttpFetcher};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("response from {url} is {size} bytes, over the {limit} byte limit")]
    TooLarge {
        url: String,
        size: usize,
        limit: usize,
    },
    #[error("no catalog record found for {0}")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl FetchError {
    /// The body exceeded the caller's byte ceiling.
    pub fn is_too_large(&self) -> bool {
        matches!(self, FetchError::TooLarge { .. })
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::TooLarge { .. } | FetchError::Invalid(_))
    }
}

/// Downloaded bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// App-catalog record, stored under `metadata_snapshot.appStore`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
}

#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// GET an image, failing with [`FetchError::TooLarge`] past `max_bytes`.
    async fn fetch_image(&self, url: &str, max_bytes: usize) -> Result<FetchedImage, FetchError>;

    /// Render `target_url` in the headless-browser service.
    async fn capture_screenshot(&self, target_url: &str) -> Result<FetchedImage, FetchError>;

    /// Look up the app-catalog record for the app id embedded in `source_url`.
    async fn lookup_app(&self, source_url: &str) -> Result<AppMetadata, FetchError>;
}
