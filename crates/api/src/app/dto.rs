use serde::{Deserialize, Serialize};
use validator::Validate;

use castle_auth::{PrincipalId, Role};

// -------------------------
// Request DTOs
// -------------------------

/// Registration and update body.
#[derive(Debug, Deserialize, Validate)]
pub struct UserPayload {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,

    #[validate(length(min = 5, max = 64, message = "password must be between 5 and 64 characters"))]
    pub password: String,

    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizerRequest {
    pub id: PrincipalId,

    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdministratorRequest {
    pub id: PrincipalId,
    #[serde(rename = "securityLevel")]
    pub security_level: i32,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub principal_id: PrincipalId,
    pub role: Role,
}
