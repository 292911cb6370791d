use crate::{AppState, error::ApiError, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: the liveness probe, anti-forgery
/// token issuance, and the account endpoints that necessarily precede a
/// session. Every `/api` route declares its wrong-verb outcome explicitly
/// so 405 carries the allowed set.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness endpoint for monitoring and load
        // balancer checks.
        .route("/health", get(|| async { "ok" }))
        // GET /api/token
        // Issues the anti-forgery token cookie consumed by the CSRF
        // middleware on unsafe verbs.
        .route(
            "/api/token",
            get(handlers::issue_token)
                .fallback(|| async { ApiError::method_not_allowed(&["GET"]) }),
        )
        // POST /api/signup
        // New user registration.
        .route(
            "/api/signup",
            post(handlers::signup)
                .fallback(|| async { ApiError::method_not_allowed(&["POST"]) }),
        )
        // POST /api/signin
        // Credential check and session establishment.
        .route(
            "/api/signin",
            post(handlers::signin)
                .fallback(|| async { ApiError::method_not_allowed(&["POST"]) }),
        )
}
