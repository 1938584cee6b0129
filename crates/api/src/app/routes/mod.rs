use axum::{
    routing::{delete, get, post, put},
    Router,
};

use castle_auth::{AccessGate, Role};

use crate::middleware::protect;

pub mod sessions;
pub mod system;
pub mod users;

/// Every route under `/api/v1`, each group behind the gate it needs.
pub fn router(gate: AccessGate) -> Router {
    let public = Router::new()
        .route("/health", get(system::health))
        .route("/users/register", post(users::register))
        .route("/users/login", post(sessions::login))
        .route("/users/refresh", post(sessions::refresh));

    let any_role = Router::new()
        .route("/whoami", get(system::whoami))
        .route("/users/logout", post(sessions::logout))
        .route("/users/:id", get(users::get_user))
        .route("/users/update/:id", put(users::update_user))
        .route("/users/delete/:id", delete(users::delete_user))
        .route("/organizers/:id", get(users::get_organizer));

    let administrators = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/create-organizer", post(users::create_organizer))
        .route("/users/create-administrator", post(users::create_administrator));

    public
        .merge(protect(any_role, gate.clone(), &Role::ALL))
        .merge(protect(administrators, gate, &[Role::Administrator]))
}
