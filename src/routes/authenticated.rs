use crate::{AppState, error::ApiError, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes whose handlers all start with the `AuthUser` extractor, so an
/// anonymous caller gets 401 before the payload is read or any id is looked
/// up. Ownership checks for item mutation live inside the handlers, after
/// the existence check.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/signout
        // Tears down the caller's session.
        .route(
            "/api/signout",
            get(handlers::signout)
                .fallback(|| async { ApiError::method_not_allowed(&["GET"]) }),
        )
        // GET/POST /api/article
        // Collection listing and creation.
        .route(
            "/api/article",
            get(handlers::list_articles)
                .post(handlers::create_article)
                .fallback(|| async { ApiError::method_not_allowed(&["GET", "POST"]) }),
        )
        // GET/PUT/DELETE /api/article/{id}
        // Item read, owner-only overwrite, owner-only cascade delete.
        .route(
            "/api/article/{id}",
            get(handlers::get_article)
                .put(handlers::update_article)
                .delete(handlers::delete_article)
                .fallback(|| async { ApiError::method_not_allowed(&["GET", "PUT", "DELETE"]) }),
        )
        // GET/POST /api/article/{id}/comment
        // Sub-collection listing and creation under one article.
        .route(
            "/api/article/{id}/comment",
            get(handlers::list_comments)
                .post(handlers::create_comment)
                .fallback(|| async { ApiError::method_not_allowed(&["GET", "POST"]) }),
        )
        // GET/PUT/DELETE /api/comment/{id}
        // Comment item operations, same contract shape as the article item.
        .route(
            "/api/comment/{id}",
            get(handlers::get_comment)
                .put(handlers::update_comment)
                .delete(handlers::delete_comment)
                .fallback(|| async { ApiError::method_not_allowed(&["GET", "PUT", "DELETE"]) }),
        )
}
