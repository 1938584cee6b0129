use axum::{extract::Extension, http::StatusCode, Json};

use castle_auth::Identity;

use crate::app::dto::WhoAmIResponse;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(identity): Extension<Identity>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        principal_id: identity.principal_id(),
        role: identity.role(),
    })
}
