//! Credential verification for the privileged endpoints.
//!
//! Each endpoint declares an ordered list of accepted [`CredentialScheme`]s; the
//! [`CredentialVerifier`] tries them in order and reports either the resolved
//! [`Actor`] or the most specific [`AuthRejection`].

pub mod keys;
pub mod session;
mod verifier;

use axum::http::{HeaderMap, StatusCode};
use serde::Serialize;

pub use verifier::{
    API_KEY_HEADER, CredentialScheme, CredentialVerifier, INTERNAL_SECRET_HEADER, VerifyContext,
};

use crate::audit::{AuditEntry, AuditOutcome};
use crate::error::AppError;
use crate::extractors::client::ClientInfo;
use crate::extractors::correlation::CorrelationId;
use crate::state::AppState;

/// Scope an API key needs to call `POST /ingest/blog`.
pub const BLOG_INGEST_SCOPE: &str = "blog_ingest";
/// Scope an API key needs to call the media upload endpoints.
pub const MEDIA_SCOPE: &str = "media_upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    User,
    ApiKey,
    Internal,
}

impl ActorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::ApiKey => "api_key",
            ActorType::Internal => "internal",
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub actor_type: ActorType,
}

impl Actor {
    pub fn internal() -> Self {
        Self {
            id: "internal".into(),
            actor_type: ActorType::Internal,
        }
    }
}

/// Why a request was not authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRejection {
    pub status: StatusCode,
    pub message: String,
}

impl AuthRejection {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }
}

impl From<AuthRejection> for AppError {
    fn from(rejection: AuthRejection) -> Self {
        if rejection.status == StatusCode::FORBIDDEN {
            AppError::Forbidden(rejection.message)
        } else {
            AppError::Unauthorized(rejection.message)
        }
    }
}

/// What to record when a privileged call is rejected.
pub struct RejectionAudit<'a> {
    /// Audit action, e.g. `blog.ingest.rejected`.
    pub action: &'a str,
    pub entity_type: &'a str,
    /// Actor type to attribute the anonymous attempt to.
    pub actor_type: ActorType,
}

/// Verify the caller and write a failure audit entry when verification fails.
pub async fn authorize(
    state: &AppState,
    verifier: &CredentialVerifier,
    headers: &HeaderMap,
    correlation_id: &CorrelationId,
    client: &ClientInfo,
    on_reject: RejectionAudit<'_>,
) -> Result<Actor, AppError> {
    let ctx = VerifyContext {
        db: &state.db,
        auth: &state.config.auth,
    };

    match verifier.verify(headers, ctx).await {
        Ok(actor) => Ok(actor),
        Err(rejection) => {
            tracing::warn!(
                action = on_reject.action,
                status = rejection.status.as_u16(),
                reason = %rejection.message,
                "Authorization rejected"
            );
            state
                .audit
                .record(
                    AuditEntry::new(
                        "unknown",
                        on_reject.actor_type,
                        on_reject.action,
                        on_reject.entity_type,
                        AuditOutcome::Failure,
                    )
                    .correlation_id(correlation_id.as_str())
                    .client(client)
                    .detail(serde_json::json!({ "reason": rejection.message })),
                )
                .await;
            Err(rejection.into())
        }
    }
}
