use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use castle_auth::{Denial, DenialKind, SessionError};
use castle_infra::AccountError;
use validator::ValidationErrors;

pub const PERMISSION_DENIED: &str = "permission denied";

/// Generic denial body. The precise cause stays in the logs.
pub fn denial_response(denial: &Denial) -> axum::response::Response {
    match denial.kind() {
        DenialKind::Unauthenticated => json_error(StatusCode::UNAUTHORIZED, "unauthorized", PERMISSION_DENIED),
        DenialKind::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", PERMISSION_DENIED),
        DenialKind::Unavailable => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            "authorization temporarily unavailable",
        ),
    }
}

pub fn forbidden() -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", PERMISSION_DENIED)
}

pub fn account_error_response(err: AccountError) -> axum::response::Response {
    match err {
        AccountError::UsernameTaken(_) | AccountError::EmailTaken(_) | AccountError::MarkerExists(..) => {
            json_error(StatusCode::CONFLICT, "conflict", err.to_string())
        }
        AccountError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        AccountError::Backend(_) => {
            tracing::error!(error = %err, "account store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal error")
        }
    }
}

/// Refresh/logout failures. Directory outages are 503; everything else is 401.
pub fn session_error_response(err: SessionError) -> axum::response::Response {
    match err {
        SessionError::Directory(e) => {
            tracing::warn!(error = %e, "session rejected: directory unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "authorization temporarily unavailable",
            )
        }
        other => {
            tracing::warn!(cause = %other, "session rejected");
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", PERMISSION_DENIED)
        }
    }
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Rejected request body: 400 listing every failed field.
pub fn validation_response(errors: ValidationErrors) -> axum::response::Response {
    bad_request(errors.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
