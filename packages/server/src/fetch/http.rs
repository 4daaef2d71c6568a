use std::time::Duration;

use async_trait::async_trait;
use common::retry::{RetryPolicy, retry_async};
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};

use super::app_catalog::{extract_app_id, parse_lookup};
use super::{AppMetadata, FetchError, FetchedImage, RemoteFetcher};
use crate::config::IngestionConfig;

const SCREENSHOT_VIEWPORT: (u32, u32) = (1280, 720);

#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub fetch_timeout: Duration,
    pub screenshot_timeout: Duration,
    pub retry: RetryPolicy,
    pub screenshot_url: String,
    pub screenshot_api_key: Option<String>,
    pub catalog_base_url: String,
    pub catalog_country: String,
}

impl From<&IngestionConfig> for FetcherSettings {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            screenshot_timeout: Duration::from_millis(config.screenshot_timeout_ms),
            retry: RetryPolicy::once().with_retries(config.fetch_retries.min(1)),
            screenshot_url: config.screenshot_url.clone(),
            screenshot_api_key: config.screenshot_api_key.clone(),
            catalog_base_url: config.app_catalog_base_url.clone(),
            catalog_country: config.app_catalog_country.clone(),
        }
    }
}

/// [`RemoteFetcher`] backed by a shared `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
    settings: FetcherSettings,
}

impl HttpFetcher {
    pub fn new(settings: FetcherSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("atelier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    async fn send(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<reqwest::Response, FetchError> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn try_fetch_image(&self, url: &str, max_bytes: usize) -> Result<FetchedImage, FetchError> {
        let response = self
            .send(url, self.client.get(url), self.settings.fetch_timeout)
            .await?;
        let content_type = header_content_type(&response)
            .or_else(|| mime_guess::from_path(url_path(url)).first().map(|m| m.to_string()))
            .unwrap_or_else(|| "application/octet-stream".into());

        let bytes = response.bytes().await.map_err(|e| transport(url, e))?;
        if bytes.len() > max_bytes {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                size: bytes.len(),
                limit: max_bytes,
            });
        }

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn try_capture(&self, target_url: &str, api_key: &str) -> Result<FetchedImage, FetchError> {
        let endpoint = format!(
            "{}/screenshot",
            self.settings.screenshot_url.trim_end_matches('/')
        );
        let payload = json!({
            "url": target_url,
            "options": {
                "fullPage": true,
                "waitUntil": "networkidle0",
                "viewport": {
                    "width": SCREENSHOT_VIEWPORT.0,
                    "height": SCREENSHOT_VIEWPORT.1,
                },
            },
        });

        let request = self
            .client
            .post(&endpoint)
            .query(&[("token", api_key)])
            .json(&payload);
        let response = self
            .send(&endpoint, request, self.settings.screenshot_timeout)
            .await?;
        let content_type = header_content_type(&response).unwrap_or_else(|| "image/png".into());

        let bytes = response.bytes().await.map_err(|e| transport(&endpoint, e))?;
        if bytes.is_empty() {
            return Err(FetchError::Decode {
                url: endpoint,
                reason: "empty screenshot body".into(),
            });
        }

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn try_lookup(&self, app_id: &str) -> Result<AppMetadata, FetchError> {
        let url = &self.settings.catalog_base_url;
        let request = self.client.get(url).query(&[
            ("id", app_id),
            ("country", self.settings.catalog_country.as_str()),
        ]);
        let response = self.send(url, request, self.settings.fetch_timeout).await?;

        let body: Value = response.json().await.map_err(|e| FetchError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        parse_lookup(&body).ok_or_else(|| FetchError::NotFound(app_id.to_string()))
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_image(&self, url: &str, max_bytes: usize) -> Result<FetchedImage, FetchError> {
        retry_async(self.settings.retry, FetchError::is_retryable, move || {
            self.try_fetch_image(url, max_bytes)
        })
        .await
    }

    async fn capture_screenshot(&self, target_url: &str) -> Result<FetchedImage, FetchError> {
        let api_key = self
            .settings
            .screenshot_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FetchError::Invalid("screenshot service API key is not configured".into()))?;

        retry_async(self.settings.retry, FetchError::is_retryable, move || {
            self.try_capture(target_url, api_key)
        })
        .await
    }

    async fn lookup_app(&self, source_url: &str) -> Result<AppMetadata, FetchError> {
        let app_id = extract_app_id(source_url)
            .ok_or_else(|| FetchError::Invalid(format!("no app id in {source_url}")))?;

        retry_async(self.settings.retry, FetchError::is_retryable, move || {
            self.try_lookup(app_id)
        })
        .await
    }
}

fn transport(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

fn header_content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

/// Path component of a URL, for extension-based MIME guessing.
fn url_path(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => without_query,
    }
}
