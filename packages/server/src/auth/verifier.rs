use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use super::keys::{hash_api_key, hashes_match, secrets_match};
use super::session::{self, ADMIN_ROLE, SESSION_COOKIE};
use super::{Actor, ActorType, AuthRejection};
use crate::config::AuthConfig;
use crate::entity::api_key;

pub const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";
pub const API_KEY_HEADER: &str = "x-api-key";

/// One way a caller can prove who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialScheme {
    /// Shared secret in `x-internal-secret` for service-to-service calls.
    InternalSecret,
    /// Hashed API key in `x-api-key`, restricted to keys with this scope.
    ApiKey { scope: &'static str },
    /// Signed admin session token in the `admin_session` cookie.
    SessionCookie,
    /// Signed admin session token in `Authorization: Bearer`.
    BearerSession,
}

/// Dependencies a scheme may consult.
#[derive(Clone, Copy)]
pub struct VerifyContext<'a> {
    pub db: &'a DatabaseConnection,
    pub auth: &'a AuthConfig,
}

enum Attempt {
    Accepted(Actor),
    /// The scheme's credential was not presented.
    Absent,
    Rejected(AuthRejection),
}

/// Ordered list of schemes tried until one accepts.
#[derive(Debug, Clone, Copy)]
pub struct CredentialVerifier {
    schemes: &'static [CredentialScheme],
}

impl CredentialVerifier {
    pub const fn new(schemes: &'static [CredentialScheme]) -> Self {
        Self { schemes }
    }

    /// `POST /ingest/portfolio`: admin session bearer token only.
    pub const PORTFOLIO_INGEST: Self = Self::new(&[CredentialScheme::BearerSession]);

    /// `POST /ingest/blog`: API key scoped to blog ingestion.
    pub const BLOG_INGEST: Self = Self::new(&[CredentialScheme::ApiKey {
        scope: super::BLOG_INGEST_SCOPE,
    }]);

    /// Media uploads and listing.
    pub const MEDIA: Self = Self::new(&[
        CredentialScheme::InternalSecret,
        CredentialScheme::ApiKey {
            scope: super::MEDIA_SCOPE,
        },
        CredentialScheme::SessionCookie,
        CredentialScheme::BearerSession,
    ]);

    /// Destructive admin operations.
    pub const ADMIN: Self = Self::new(&[
        CredentialScheme::InternalSecret,
        CredentialScheme::SessionCookie,
        CredentialScheme::BearerSession,
    ]);

    /// Admin session only (presigned uploads).
    pub const ADMIN_SESSION: Self = Self::new(&[
        CredentialScheme::SessionCookie,
        CredentialScheme::BearerSession,
    ]);

    /// Try each scheme in order.
    ///
    /// A scheme whose credential is absent or invalid falls through to the next.
    /// When none accepts, a 403 from any scheme wins over a 401, and an invalid
    /// credential wins over a missing one.
    pub async fn verify(
        &self,
        headers: &HeaderMap,
        ctx: VerifyContext<'_>,
    ) -> Result<Actor, AuthRejection> {
        let mut rejection: Option<AuthRejection> = None;

        for scheme in self.schemes {
            match attempt(*scheme, headers, ctx).await {
                Attempt::Accepted(actor) => return Ok(actor),
                Attempt::Absent => {}
                Attempt::Rejected(r) => {
                    let replace = match &rejection {
                        None => true,
                        Some(prev) => prev.status != r.status && r.status.as_u16() == 403,
                    };
                    if replace {
                        rejection = Some(r);
                    }
                }
            }
        }

        Err(rejection.unwrap_or_else(|| AuthRejection::unauthorized("Authentication required")))
    }
}

async fn attempt(scheme: CredentialScheme, headers: &HeaderMap, ctx: VerifyContext<'_>) -> Attempt {
    match scheme {
        CredentialScheme::InternalSecret => internal_secret(headers, ctx.auth),
        CredentialScheme::ApiKey { scope } => api_key(headers, ctx.db, scope).await,
        CredentialScheme::SessionCookie => {
            let jar = CookieJar::from_headers(headers);
            match jar.get(SESSION_COOKIE) {
                Some(cookie) => session_token(cookie.value(), ctx.auth),
                None => Attempt::Absent,
            }
        }
        CredentialScheme::BearerSession => {
            let Some(value) = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
            else {
                return Attempt::Absent;
            };
            match value.strip_prefix("Bearer ") {
                Some(token) => session_token(token.trim(), ctx.auth),
                None => Attempt::Rejected(AuthRejection::unauthorized("Invalid session")),
            }
        }
    }
}

fn internal_secret(headers: &HeaderMap, auth: &AuthConfig) -> Attempt {
    let Some(presented) = headers
        .get(INTERNAL_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        return Attempt::Absent;
    };

    match auth.internal_secret.as_deref() {
        Some(expected) if !expected.is_empty() && secrets_match(presented, expected) => {
            Attempt::Accepted(Actor::internal())
        }
        _ => Attempt::Rejected(AuthRejection::unauthorized("Invalid internal secret")),
    }
}

async fn api_key(headers: &HeaderMap, db: &DatabaseConnection, scope: &str) -> Attempt {
    let Some(presented) = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return Attempt::Absent;
    };

    let candidates = match api_key::Entity::find()
        .filter(api_key::Column::Scope.eq(scope))
        .filter(api_key::Column::Active.eq(true))
        .all(db)
        .await
    {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!(error = %e, "API key lookup failed");
            return Attempt::Rejected(AuthRejection::unauthorized("Invalid API key"));
        }
    };

    let presented_hash = hash_api_key(presented);
    match candidates
        .into_iter()
        .find(|key| hashes_match(&presented_hash, &key.key_hash))
    {
        Some(key) => Attempt::Accepted(Actor {
            id: key.id.to_string(),
            actor_type: ActorType::ApiKey,
        }),
        None => Attempt::Rejected(AuthRejection::unauthorized("Invalid API key")),
    }
}

fn session_token(token: &str, auth: &AuthConfig) -> Attempt {
    match session::verify(&auth.session_secret, token) {
        Ok(claims) if claims.has_role(ADMIN_ROLE) => Attempt::Accepted(Actor {
            id: claims.sub,
            actor_type: ActorType::User,
        }),
        Ok(_) => Attempt::Rejected(AuthRejection::forbidden("Admin role required")),
        Err(_) => Attempt::Rejected(AuthRejection::unauthorized("Invalid or expired session")),
    }
}
