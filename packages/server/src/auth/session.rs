use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Name of the cookie that carries the admin session token.
pub const SESSION_COOKIE: &str = "admin_session";
pub const ADMIN_ROLE: &str = "admin";

/// Claims of an admin session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub roles: Vec<String>,
    pub iat: usize,
    pub exp: usize,
}

impl SessionClaims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Sign a session token for `subject` valid for `ttl_hours`.
pub fn sign(
    secret: &str,
    subject: &str,
    roles: &[&str],
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = now + Duration::hours(ttl_hours.clamp(1, 24 * 365));

    let claims = SessionClaims {
        sub: subject.to_owned(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify and decode a session token.
pub fn verify(secret: &str, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
