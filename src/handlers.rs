use crate::{
    AppState, auth,
    auth::AuthUser,
    error::ApiError,
    models::{
        ArticleRequest, ArticleResponse, ArticleSummary, CommentRequest, CommentResponse,
        CommentSummary, CredentialsRequest,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::{StatusCode, header},
    response::{AppendHeaders, IntoResponse},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// JsonPayload
///
/// Body extractor for the mutating endpoints. Unlike `axum::Json`, every
/// failure mode (unreadable body, unparsable JSON, missing field) collapses
/// into `ApiError::BadRequest`: a malformed encoding and a missing required
/// field are the same 400 outcome.
///
/// As a body extractor it runs last, after `AuthUser`, which keeps the
/// check order auth-before-payload on every protected route.
pub struct JsonPayload<T>(pub T);

impl<S, T> FromRequest<S> for JsonPayload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::BadRequest)?;
        let value = serde_json::from_slice(&bytes).map_err(|_| ApiError::BadRequest)?;
        Ok(JsonPayload(value))
    }
}

// --- Account Handlers ---

/// issue_token
///
/// [Public Route] Issues a fresh anti-forgery token in the `csrftoken`
/// cookie. Read-only and idempotent; the CSRF middleware consumes the token
/// on every unsafe-verb request.
#[utoipa::path(
    get,
    path = "/api/token",
    responses((status = 204, description = "Token issued in csrftoken cookie"))
)]
pub async fn issue_token() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, auth::csrf_cookie(Uuid::new_v4()))]),
    )
}

/// signup
///
/// [Public Route] Creates a new user from `{username, password}`. The
/// password is hashed with Argon2id before it touches the repository; a
/// duplicate username surfaces as 400 via the conflict translation.
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Missing or malformed credentials")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    JsonPayload(payload): JsonPayload<CredentialsRequest>,
) -> Result<StatusCode, ApiError> {
    payload.validate()?;
    let hash =
        auth::hash_password(&payload.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    state.repo.create_user(&payload.username, &hash).await?;
    Ok(StatusCode::CREATED)
}

/// signin
///
/// [Public Route] Verifies credentials and establishes a session.
///
/// A missing or malformed payload is 400; an unknown username or a wrong
/// password is 401 — a normal outcome of the credential check, not a
/// payload fault. On success a session row is created and its token set as
/// an HttpOnly cookie, 204 with no body.
#[utoipa::path(
    post,
    path = "/api/signin",
    request_body = CredentialsRequest,
    responses(
        (status = 204, description = "Session established"),
        (status = 400, description = "Missing or malformed credentials"),
        (status = 401, description = "Credentials do not match")
    )
)]
pub async fn signin(
    State(state): State<AppState>,
    JsonPayload(payload): JsonPayload<CredentialsRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    payload.validate()?;

    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let matches = auth::verify_password(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !matches {
        return Err(ApiError::Unauthenticated);
    }

    let session = state.repo.create_session(user.id).await?;
    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, auth::session_cookie(session.token))]),
    ))
}

/// signout
///
/// [Authenticated Route] Tears the caller's session down and expires the
/// cookie. 401 without an active session, via the `AuthUser` extractor.
#[utoipa::path(
    get,
    path = "/api/signout",
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "No active session")
    )
)]
pub async fn signout(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state.repo.delete_session(user.session_token).await?;
    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, auth::clear_session_cookie())]),
    ))
}

// --- Article Collection Handlers ---

/// list_articles
///
/// [Authenticated Route] Every article, in insertion order, projected
/// without its id (the id travels in item URLs).
#[utoipa::path(
    get,
    path = "/api/article",
    responses(
        (status = 200, description = "All articles", body = [ArticleSummary]),
        (status = 401, description = "No active session")
    )
)]
pub async fn list_articles(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleSummary>>, ApiError> {
    let articles = state.repo.list_articles().await?;
    Ok(Json(articles.into_iter().map(ArticleSummary::from).collect()))
}

/// create_article
///
/// [Authenticated Route] Creates an article owned by the caller. `title`
/// and `content` must be present and non-empty. Returns the full created
/// representation including the assigned id.
#[utoipa::path(
    post,
    path = "/api/article",
    request_body = ArticleRequest,
    responses(
        (status = 201, description = "Article created", body = ArticleResponse),
        (status = 400, description = "Missing or empty title/content"),
        (status = 401, description = "No active session")
    )
)]
pub async fn create_article(
    user: AuthUser,
    State(state): State<AppState>,
    JsonPayload(payload): JsonPayload<ArticleRequest>,
) -> Result<(StatusCode, Json<ArticleResponse>), ApiError> {
    payload.validate()?;
    let article = state
        .repo
        .create_article(user.id, &payload.title, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(ArticleResponse::from(article))))
}

// --- Article Item Handlers ---

/// get_article
///
/// [Authenticated Route] Reads one article by id. Any authenticated user
/// may read any article; ownership only gates mutation.
#[utoipa::path(
    get,
    path = "/api/article/{id}",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = ArticleSummary),
        (status = 401, description = "No active session"),
        (status = 404, description = "No such article")
    )
)]
pub async fn get_article(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleSummary>, ApiError> {
    let article = state.repo.get_article(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(ArticleSummary::from(article)))
}

/// update_article
///
/// [Authenticated Route] Overwrites title and content of the caller's own
/// article.
///
/// Check order is binding: payload shape (400) before existence (404)
/// before ownership (403). A request that is malformed *and* targets a
/// missing article is a 400.
#[utoipa::path(
    put,
    path = "/api/article/{id}",
    params(("id" = i64, Path, description = "Article id")),
    request_body = ArticleRequest,
    responses(
        (status = 200, description = "Updated article", body = ArticleResponse),
        (status = 400, description = "Missing or empty title/content"),
        (status = 401, description = "No active session"),
        (status = 403, description = "Caller is not the author"),
        (status = 404, description = "No such article")
    )
)]
pub async fn update_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonPayload(payload): JsonPayload<ArticleRequest>,
) -> Result<Json<ArticleResponse>, ApiError> {
    payload.validate()?;

    let article = state.repo.get_article(id).await?.ok_or(ApiError::NotFound)?;
    if article.author_id != user.id {
        return Err(ApiError::Forbidden);
    }

    let updated = state
        .repo
        .update_article(id, &payload.title, &payload.content)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ArticleResponse::from(updated)))
}

/// delete_article
///
/// [Authenticated Route] Deletes the caller's own article, cascading to its
/// comments in one transaction. Existence (404) is checked before
/// ownership (403).
#[utoipa::path(
    delete,
    path = "/api/article/{id}",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 401, description = "No active session"),
        (status = 403, description = "Caller is not the author"),
        (status = 404, description = "No such article")
    )
)]
pub async fn delete_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let article = state.repo.get_article(id).await?.ok_or(ApiError::NotFound)?;
    if article.author_id != user.id {
        return Err(ApiError::Forbidden);
    }

    state.repo.delete_article(id).await?;
    Ok(StatusCode::OK)
}

// --- Article-Comments Sub-collection Handlers ---

/// list_comments
///
/// [Authenticated Route] Every comment under one article, in insertion
/// order. 404 if the article itself does not exist.
#[utoipa::path(
    get,
    path = "/api/article/{id}/comment",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 200, description = "Comments under the article", body = [CommentSummary]),
        (status = 401, description = "No active session"),
        (status = 404, description = "No such article")
    )
)]
pub async fn list_comments(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<Json<Vec<CommentSummary>>, ApiError> {
    state
        .repo
        .get_article(article_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let comments = state.repo.list_comments(article_id).await?;
    Ok(Json(comments.into_iter().map(CommentSummary::from).collect()))
}

/// create_comment
///
/// [Authenticated Route] Creates a comment under an article, owned by the
/// caller.
///
/// The payload is validated *before* the article lookup: a malformed
/// payload against a non-existing article is still a 400.
#[utoipa::path(
    post,
    path = "/api/article/{id}/comment",
    params(("id" = i64, Path, description = "Article id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Missing or empty content"),
        (status = 401, description = "No active session"),
        (status = 404, description = "No such article")
    )
)]
pub async fn create_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    JsonPayload(payload): JsonPayload<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    payload.validate()?;

    state
        .repo
        .get_article(article_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let comment = state
        .repo
        .create_comment(article_id, user.id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

// --- Comment Item Handlers ---

/// get_comment
///
/// [Authenticated Route] Reads one comment by id.
#[utoipa::path(
    get,
    path = "/api/comment/{id}",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 401, description = "No active session"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn get_comment(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state.repo.get_comment(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(CommentResponse::from(comment)))
}

/// update_comment
///
/// [Authenticated Route] Overwrites the content of the caller's own
/// comment. Same check order as the article item handler: payload, then
/// existence, then ownership.
#[utoipa::path(
    put,
    path = "/api/comment/{id}",
    params(("id" = i64, Path, description = "Comment id")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated comment", body = CommentResponse),
        (status = 400, description = "Missing or empty content"),
        (status = 401, description = "No active session"),
        (status = 403, description = "Caller is not the author"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn update_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonPayload(payload): JsonPayload<CommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    payload.validate()?;

    let comment = state.repo.get_comment(id).await?.ok_or(ApiError::NotFound)?;
    if comment.author_id != user.id {
        return Err(ApiError::Forbidden);
    }

    let updated = state
        .repo
        .update_comment(id, &payload.content)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(CommentResponse::from(updated)))
}

/// delete_comment
///
/// [Authenticated Route] Deletes the caller's own comment. Existence (404)
/// before ownership (403).
#[utoipa::path(
    delete,
    path = "/api/comment/{id}",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 401, description = "No active session"),
        (status = 403, description = "Caller is not the author"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let comment = state.repo.get_comment(id).await?.ok_or(ApiError::NotFound)?;
    if comment.author_id != user.id {
        return Err(ApiError::Forbidden);
    }

    state.repo.delete_comment(id).await?;
    Ok(StatusCode::OK)
}
