pub mod admin;
pub mod health;
pub mod ingest;
pub mod media;

use std::time::Duration;

use serde_json::json;

use crate::audit::{AuditEntry, AuditOutcome};
use crate::auth::Actor;
use crate::error::AppError;
use crate::extractors::client::ClientInfo;
use crate::extractors::correlation::CorrelationId;
use crate::rate_limit::RateDecision;
use crate::state::AppState;

/// Count one ingestion request against `key`'s fixed window.
fn enforce_rate_limit(state: &AppState, key: &str) -> Result<(), AppError> {
    let limits = state.config.ingestion.rate_limit;
    match state
        .rate_limiter
        .check(key, limits.limit, Duration::from_millis(limits.window_ms))
    {
        RateDecision::Allowed => Ok(()),
        RateDecision::Limited { retry_after_secs } => {
            tracing::warn!(key, retry_after_secs, "Rate limit exceeded");
            Err(AppError::RateLimited {
                retry_after: retry_after_secs,
            })
        }
    }
}

/// Server-side failures are audited; caller errors (4xx) are not.
async fn audit_failure(
    state: &AppState,
    actor: &Actor,
    action: &str,
    entity_type: &str,
    correlation_id: &CorrelationId,
    client: &ClientInfo,
    error: &AppError,
) {
    if !error.status().is_server_error() {
        return;
    }
    state
        .audit
        .record(
            AuditEntry::by(actor, action, entity_type, AuditOutcome::Failure)
                .correlation_id(correlation_id.as_str())
                .client(client)
                .detail(json!({ "error": error.to_string() })),
        )
        .await;
}
