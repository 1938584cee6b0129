//! Gate middleware: bearer extraction and admission for protected routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
    Router,
};
use chrono::Utc;

use castle_auth::{AccessGate, Role};

use crate::app::errors;

#[derive(Clone)]
pub struct GateState {
    pub gate: AccessGate,
    pub required: Arc<[Role]>,
}

/// Admit the request through the gate and attach its [`castle_auth::Identity`].
pub async fn gate_middleware(State(state): State<GateState>, mut req: Request<Body>, next: Next) -> Response {
    let token = extract_bearer(req.headers()).map(str::to_owned);

    match state.gate.admit(token.as_deref(), &state.required, Utc::now()).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(denial) => errors::denial_response(&denial),
    }
}

/// Guard every route of `router` with the gate. An empty `required` admits any role.
pub fn protect<S>(router: Router<S>, gate: AccessGate, required: &[Role]) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let state = GateState {
        gate,
        required: Arc::from(required),
    };
    router.route_layer(axum::middleware::from_fn_with_state(state, gate_middleware))
}

/// `Authorization: Bearer <token>`; anything else counts as no token.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        return None;
    }
    Some(token)
}
