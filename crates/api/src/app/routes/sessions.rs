//! Login, refresh and logout.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use validator::Validate;

use castle_auth::{verify_password, Identity, DUMMY_PASSWORD_HASH};

use crate::app::dto::{LoginRequest, LoginResponse, LogoutRequest, RefreshResponse};
use crate::app::errors::{self, json_error, PERMISSION_DENIED};
use crate::app::services::AppServices;
use crate::middleware::extract_bearer;

fn bad_credentials() -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid username or password")
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::validation_response(e);
    }

    let account = match services.accounts.find_by_username(&body.username).await {
        Ok(account) => account,
        Err(e) => return errors::account_error_response(e),
    };

    // Unknown usernames still pay for one Argon2 run.
    let hash = account
        .as_ref()
        .map_or_else(|| DUMMY_PASSWORD_HASH.to_string(), |a| a.password_hash.clone());
    let verified = tokio::task::spawn_blocking(move || verify_password(&body.password, &hash))
        .await
        .unwrap_or(false);
    let account = match account {
        Some(account) if verified => account,
        _ => return bad_credentials(),
    };

    let now = Utc::now();
    let pair = match services.sessions.login(account.id, now).await {
        Ok(pair) => pair,
        Err(e) => return errors::session_error_response(e),
    };
    if let Err(e) = services.accounts.record_login(account.id, now).await {
        tracing::warn!(principal_id = %account.id, error = %e, "failed to record login time");
    }

    (
        StatusCode::OK,
        Json(LoginResponse {
            access_token: pair.access.token,
            refresh_token: pair.refresh.token,
        }),
    )
        .into_response()
}

/// The refresh token travels in the bearer header.
pub async fn refresh(Extension(services): Extension<Arc<AppServices>>, headers: HeaderMap) -> axum::response::Response {
    let Some(token) = extract_bearer(&headers) else {
        tracing::warn!(cause = "no bearer token presented", "refresh rejected");
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", PERMISSION_DENIED);
    };

    match services.sessions.refresh(token, Utc::now()).await {
        Ok(access) => (StatusCode::OK, Json(RefreshResponse { access_token: access.token })).into_response(),
        Err(e) => errors::session_error_response(e),
    }
}

/// Revoke the presented access token and, if given, the caller's refresh token.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
    body: Option<Json<LogoutRequest>>,
) -> axum::response::Response {
    let now = Utc::now();
    let body = body.map(|Json(body)| body).unwrap_or_default();

    if let Some(refresh) = body.refresh_token.as_deref() {
        match services.codec.decode(refresh, now) {
            Ok(claims) if claims.principal_id != identity.principal_id() => return errors::forbidden(),
            Ok(_) | Err(castle_auth::TokenError::Expired) => {}
            Err(_) => return errors::bad_request("refresh_token is not a valid token"),
        }
        if let Err(e) = services.sessions.logout(refresh, now) {
            return errors::session_error_response(e);
        }
    }

    match extract_bearer(&headers) {
        Some(token) => {
            if let Err(e) = services.sessions.logout(token, now) {
                return errors::session_error_response(e);
            }
        }
        None => tracing::warn!(principal_id = %identity.principal_id(), "logout without a bearer token"),
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "successfully logged out" })),
    )
        .into_response()
}
