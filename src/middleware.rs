use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tracing::{info, warn};

/// Requires a non-empty `Authorization` header on paths under `prefix`.
#[derive(Debug, Clone)]
pub struct AuthGate {
    prefix: Arc<str>,
}

impl AuthGate {
    pub fn new(prefix: impl Into<Arc<str>>) -> Self {
        AuthGate {
            prefix: prefix.into(),
        }
    }

    pub fn guards(&self, path: &str) -> bool {
        path.starts_with(&*self.prefix)
    }
}

/// Wraps `router` in the logging and auth middleware.
pub fn apply(router: Router, gate: AuthGate) -> Router {
    // The last layer added is the outermost, so logging goes on last.
    router
        .layer(middleware::from_fn_with_state(gate, require_token))
        .layer(middleware::from_fn(log_requests))
}

pub async fn log_requests(req: Request, next: Next) -> Response {
    info!("{} {}", req.method(), req.uri());
    next.run(req).await
}

pub async fn require_token(State(gate): State<AuthGate>, req: Request, next: Next) -> Response {
    if gate.guards(req.uri().path()) && !has_token(&req) {
        warn!("Rejected {} without a token", req.uri().path());
        return (StatusCode::UNAUTHORIZED, "Token not found").into_response();
    }
    next.run(req).await
}

fn has_token(req: &Request) -> bool {
    req.headers()
        .get(header::AUTHORIZATION)
        .map(|value| !value.as_bytes().trim_ascii().is_empty())
        .unwrap_or(false)
}
