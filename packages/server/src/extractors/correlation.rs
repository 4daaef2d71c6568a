use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

const MAX_INBOUND_LEN: usize = 128;

tokio::task_local! {
    static CURRENT: String;
}

/// Correlation id of the request being served on this task, if any.
pub fn current() -> Option<String> {
    CURRENT.try_with(|id| id.clone()).ok()
}

/// Per-request correlation id shared by logs, audit rows and error bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn inbound_id(req: &Request) -> Option<String> {
    let raw = req.headers().get(CORRELATION_HEADER)?.to_str().ok()?.trim();
    (!raw.is_empty() && raw.len() <= MAX_INBOUND_LEN).then(|| raw.to_string())
}

/// Middleware: adopt the caller's `x-correlation-id` or mint one, and echo it back.
pub async fn propagate(mut req: Request, next: Next) -> Response {
    let id = inbound_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(CorrelationId(id.clone()));

    let mut response = CURRENT.scope(id.clone(), next.run(req)).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<CorrelationId>()
            .map(|c| c.0.clone())
            .or_else(current)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Ok(CorrelationId(id))
    }
}
