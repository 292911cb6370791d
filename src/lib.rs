use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// Routing segregation (public vs session-protected).
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the binary entry point and
// the test suites.
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI document for the application, aggregating all
/// annotated handler paths and payload schemas. Served as JSON at
/// `/api-docs/openapi.json` and browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::issue_token, handlers::signup, handlers::signin, handlers::signout,
        handlers::list_articles, handlers::create_article, handlers::get_article,
        handlers::update_article, handlers::delete_article,
        handlers::list_comments, handlers::create_comment,
        handlers::get_comment, handlers::update_comment, handlers::delete_comment
    ),
    components(
        schemas(
            models::CredentialsRequest, models::ArticleRequest, models::CommentRequest,
            models::ArticleSummary, models::ArticleResponse,
            models::CommentSummary, models::CommentResponse,
        )
    ),
    tags(
        (name = "blog", description = "Session-authenticated blog API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding the shared application
/// services. Cloned per request; both members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: all persistence behind one trait object.
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// These implementations let extractors pull individual components out of
// the shared state, which is how `AuthUser` reaches the repository.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// csrf_middleware
///
/// Rejects every unsafe-verb request whose `X-CSRFToken` header does not
/// match the `csrftoken` cookie issued by GET /api/token. Runs before any
/// handler, so a request that fails anti-forgery never reaches the
/// per-endpoint checks. Safe verbs pass through untouched.
async fn csrf_middleware(request: Request, next: Next) -> Response {
    if !is_safe_method(request.method()) {
        let cookie = auth::cookie_value(request.headers(), auth::CSRF_COOKIE);
        let header = request
            .headers()
            .get(auth::CSRF_HEADER)
            .and_then(|value| value.to_str().ok());

        match (cookie, header) {
            (Some(expected), Some(provided)) if expected == provided => {}
            _ => {
                return (StatusCode::FORBIDDEN, "CSRF verification failed").into_response();
            }
        }
    }
    next.run(request).await
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// create_router
///
/// Assembles the routing structure, applies the CSRF and observability
/// layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no session required.
        .merge(public::public_routes())
        // Protected routes. Authentication is enforced by the `AuthUser`
        // extractor inside each handler rather than a router layer, which
        // keeps the verb check ahead of the auth check.
        .merge(authenticated::authenticated_routes())
        .with_state(state);

    // 3. Anti-forgery, then observability and correlation layers.
    base_router
        .layer(middleware::from_fn(csrf_middleware))
        .layer(
            ServiceBuilder::new()
                // Request ID generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Request tracing: wraps the request/response lifecycle in
                // a span correlated by the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Return the generated x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer (outermost).
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the `TraceLayer` span: includes the `x-request-id` header (if
/// present) alongside the HTTP method and URI, so every log line for one
/// request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
