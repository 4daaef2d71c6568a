use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::AppMetadata;

static APP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id(\d+)").expect("Invalid regex pattern for app id"));

static ARTWORK_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/[0-9]+x[0-9]+bb\.jpg").expect("Invalid regex pattern for artwork size")
});

/// Numeric app id from a store URL such as `https://apps.apple.com/us/app/x/id123456`.
pub fn extract_app_id(url: &str) -> Option<&str> {
    APP_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Rewrite an artwork URL to the 512px rendition.
pub fn normalize_artwork(url: &str) -> String {
    ARTWORK_SIZE.replace(url, "/512x512bb.jpg").into_owned()
}

/// First lookup result with a numeric `trackId`, mapped to [`AppMetadata`].
pub fn parse_lookup(body: &Value) -> Option<AppMetadata> {
    let record = body.get("results")?.as_array()?.first()?;
    let track_id = record.get("trackId")?.as_u64()?;

    let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);

    let summary = text("description")
        .or_else(|| text("trackCensoredName"))
        .unwrap_or_default();
    let artwork_url = text("artworkUrl512")
        .or_else(|| text("artworkUrl100"))
        .map(|url| normalize_artwork(&url));

    Some(AppMetadata {
        id: track_id.to_string(),
        title: text("trackName").unwrap_or_default(),
        summary,
        category: text("primaryGenreName"),
        rating: record.get("averageUserRating").and_then(Value::as_f64),
        rating_count: record.get("userRatingCount").and_then(Value::as_u64),
        artwork_url,
    })
}
