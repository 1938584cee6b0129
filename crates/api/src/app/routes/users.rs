//! Account management. Update and delete are restricted to the owner or an administrator.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use validator::Validate;

use castle_auth::{
    hash_password, is_owner_or_admin, AdministratorMarker, Identity, OrganizerMarker, PrincipalDirectory,
    PrincipalId,
};
use castle_infra::{Account, NewAccount};

use crate::app::dto::{CreateAdministratorRequest, CreateOrganizerRequest, UserPayload};
use crate::app::errors::{self, json_error};
use crate::app::services::AppServices;

fn parse_id(raw: &str) -> Result<PrincipalId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::bad_request(format!("invalid id '{raw}'")))
}

async fn hash(plain: String) -> Result<String, axum::response::Response> {
    let internal = || json_error(StatusCode::INTERNAL_SERVER_ERROR, "hash_error", "internal error");
    match tokio::task::spawn_blocking(move || hash_password(&plain)).await {
        Ok(Ok(hash)) => Ok(hash),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "password hashing failed");
            Err(internal())
        }
        Err(e) => {
            tracing::error!(error = %e, "password hashing task failed");
            Err(internal())
        }
    }
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<UserPayload>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::validation_response(e);
    }

    let password_hash = match hash(body.password).await {
        Ok(h) => h,
        Err(resp) => return resp,
    };
    let new = NewAccount {
        username: body.username,
        email: body.email,
        password_hash,
    };

    match services.accounts.create_account(new, Utc::now()).await {
        Ok(account) => {
            tracing::info!(principal_id = %account.id, username = %account.username, "account registered");
            (StatusCode::CREATED, Json(account)).into_response()
        }
        Err(e) => errors::account_error_response(e),
    }
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.accounts.list_accounts().await {
        Ok(accounts) => (StatusCode::OK, Json(accounts)).into_response(),
        Err(e) => errors::account_error_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.accounts.find_account(id).await {
        Ok(Some(account)) => (StatusCode::OK, Json(account)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => errors::account_error_response(e),
    }
}

pub async fn get_organizer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.accounts.find_organizer(id).await {
        Ok(Some(organizer)) => (StatusCode::OK, Json(organizer)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "organizer not found"),
        Err(e) => {
            tracing::error!(error = %e, "organizer lookup failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal error")
        }
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<UserPayload>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if !is_owner_or_admin(&identity, id) {
        tracing::warn!(principal_id = %identity.principal_id(), target = %id, "update denied: not owner");
        return errors::forbidden();
    }
    if let Err(e) = body.validate() {
        return errors::validation_response(e);
    }

    let existing = match services.accounts.find_account(id).await {
        Ok(Some(account)) => account,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => return errors::account_error_response(e),
    };
    let password_hash = match hash(body.password).await {
        Ok(h) => h,
        Err(resp) => return resp,
    };

    let updated = Account {
        username: body.username,
        email: body.email,
        password_hash,
        ..existing
    };
    match services.accounts.update_account(&updated).await {
        Ok(()) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => errors::account_error_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if !is_owner_or_admin(&identity, id) {
        tracing::warn!(principal_id = %identity.principal_id(), target = %id, "delete denied: not owner");
        return errors::forbidden();
    }

    match services.accounts.delete_account(id).await {
        Ok(true) => {
            tracing::info!(principal_id = %identity.principal_id(), target = %id, "account deleted");
            (
                StatusCode::OK,
                Json(serde_json::json!({ "message": format!("user with id {id} successfully deleted") })),
            )
                .into_response()
        }
        Ok(false) => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => errors::account_error_response(e),
    }
}

pub async fn create_organizer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CreateOrganizerRequest>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::validation_response(e);
    }

    let marker = OrganizerMarker {
        id: body.id,
        description: Some(body.description),
    };
    match services.accounts.grant_organizer(marker).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "message": format!("organizer with id {} successfully created", body.id) })),
        )
            .into_response(),
        Err(e) => errors::account_error_response(e),
    }
}

pub async fn create_administrator(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CreateAdministratorRequest>,
) -> axum::response::Response {
    let marker = AdministratorMarker {
        id: body.id,
        security_level: body.security_level,
    };
    match services.accounts.grant_administrator(marker).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "message": format!("administrator with id {} successfully created", body.id) })),
        )
            .into_response(),
        Err(e) => errors::account_error_response(e),
    }
}
