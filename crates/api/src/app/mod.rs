//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, codec, revocations, gate and sessions
//! - `routes/`: handlers grouped by area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{build_services, AppServices};

pub const API_PREFIX: &str = "/api/v1";

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let api = routes::router(services.gate.clone()).layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest(API_PREFIX, api)
}
