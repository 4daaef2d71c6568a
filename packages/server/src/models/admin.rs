use serde::{Deserialize, Serialize};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub password: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    /// Session token, also set as the `admin_session` cookie. Usable as a bearer token.
    pub token: String,
}
