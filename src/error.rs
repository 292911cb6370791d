use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// RepositoryError
///
/// Failure modes surfaced by the persistence layer. Handlers never inspect
/// these directly; they convert into `ApiError` via `From` and propagate.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness constraint was violated (e.g. duplicate username).
    #[error("unique constraint violated")]
    Conflict,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// ApiError
///
/// The complete set of failure outcomes a handler can produce. Each request
/// is classified into exactly one of these; nothing is retried or swallowed.
///
/// `Unauthenticated` covers two distinct checks that share a status code:
/// the session gate (no valid `sessionid` cookie) and a failed login
/// attempt (wrong credentials on signin).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Payload missing a required field, empty where non-empty is required,
    /// or not parsable as JSON.
    #[error("bad request")]
    BadRequest,
    /// No active session, or signin with credentials that do not match.
    #[error("authentication required")]
    Unauthenticated,
    /// Authenticated, but not the owner of the targeted resource.
    #[error("forbidden")]
    Forbidden,
    /// The referenced id does not exist.
    #[error("not found")]
    NotFound,
    /// Verb not supported at this endpoint. Carries the supported set,
    /// surfaced to the client via the `Allow` header.
    #[error("method not allowed")]
    MethodNotAllowed { allowed: &'static [&'static str] },
    /// Unexpected persistence or hashing failure. Logged, never detailed to
    /// the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn method_not_allowed(allowed: &'static [&'static str]) -> Self {
        ApiError::MethodNotAllowed { allowed }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict => ApiError::BadRequest,
            RepositoryError::Database(sqlx::Error::RowNotFound) => ApiError::NotFound,
            RepositoryError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest => StatusCode::BAD_REQUEST.into_response(),
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED.into_response(),
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::MethodNotAllowed { allowed } => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, allowed.join(", "))],
            )
                .into_response(),
            ApiError::Internal(detail) => {
                tracing::error!("internal failure: {detail}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
