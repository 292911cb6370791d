use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use blog_api::{
    AppConfig, AppState, MemoryRepository, RepositoryState,
    auth::{self, AuthUser},
    error::ApiError,
    handlers::{self, JsonPayload},
    models::{ArticleRequest, CommentRequest, CredentialsRequest},
    repository::Repository,
};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- TEST UTILITIES ---

fn test_state() -> AppState {
    AppState {
        repo: Arc::new(MemoryRepository::new()) as RepositoryState,
        config: AppConfig::default(),
    }
}

fn credentials(username: &str, password: &str) -> JsonPayload<CredentialsRequest> {
    JsonPayload(CredentialsRequest {
        username: username.to_string(),
        password: password.to_string(),
    })
}

fn article_payload(title: &str, content: &str) -> JsonPayload<ArticleRequest> {
    JsonPayload(ArticleRequest {
        title: title.to_string(),
        content: content.to_string(),
    })
}

fn comment_payload(content: &str) -> JsonPayload<CommentRequest> {
    JsonPayload(CommentRequest {
        content: content.to_string(),
    })
}

// Seeds a user with an open session, bypassing the HTTP layer, and returns
// the identity the extractor would have produced.
async fn seeded_user(state: &AppState, username: &str) -> AuthUser {
    let hash = auth::hash_password("pw").expect("hashing should succeed");
    let user = state.repo.create_user(username, &hash).await.unwrap();
    let session = state.repo.create_session(user.id).await.unwrap();
    AuthUser {
        id: user.id,
        username: user.username,
        session_token: session.token,
    }
}

// --- ACCOUNT HANDLERS ---

#[test]
async fn signup_creates_a_user() {
    let state = test_state();
    let status = handlers::signup(State(state.clone()), credentials("chris", "chris"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(
        state
            .repo
            .get_user_by_username("chris")
            .await
            .unwrap()
            .is_some()
    );
}

#[test]
async fn signup_rejects_empty_fields() {
    let state = test_state();
    let err = handlers::signup(State(state), credentials("chris", ""))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::BadRequest);
}

#[test]
async fn signup_rejects_duplicate_username() {
    let state = test_state();
    handlers::signup(State(state.clone()), credentials("chris", "chris"))
        .await
        .unwrap();
    let err = handlers::signup(State(state), credentials("chris", "other"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::BadRequest);
}

#[test]
async fn signin_with_registered_credentials_succeeds() {
    let state = test_state();
    handlers::signup(State(state.clone()), credentials("chris", "chris"))
        .await
        .unwrap();

    let response = handlers::signin(State(state), credentials("chris", "chris"))
        .await
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    // The session cookie must be established on success.
    let set_cookie = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("sessionid="));
}

#[test]
async fn signin_with_wrong_password_is_unauthenticated_not_bad_request() {
    let state = test_state();
    handlers::signup(State(state.clone()), credentials("chris", "chris"))
        .await
        .unwrap();

    let err = handlers::signin(State(state), credentials("chris", "wrong"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Unauthenticated);
}

#[test]
async fn signin_with_unknown_user_is_unauthenticated() {
    let state = test_state();
    let err = handlers::signin(State(state), credentials("nobody", "pw"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Unauthenticated);
}

#[test]
async fn signout_tears_the_session_down() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;
    let token = user.session_token;

    let response = handlers::signout(user, State(state.clone()))
        .await
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.repo.get_session(token).await.unwrap().is_none());
}

// --- ARTICLE HANDLERS ---

#[test]
async fn create_then_get_article_round_trips() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;

    let (status, axum::Json(created)) = handlers::create_article(
        user.clone(),
        State(state.clone()),
        article_payload("my tmi", "i did hw hard"),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.title, "my tmi");
    assert_eq!(created.author, user.id);

    let axum::Json(fetched) = handlers::get_article(user, State(state), Path(created.id))
        .await
        .unwrap();
    assert_eq!(fetched.title, "my tmi");
    assert_eq!(fetched.content, "i did hw hard");
    assert_eq!(fetched.author, created.author);
}

#[test]
async fn reading_an_article_twice_returns_identical_representations() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;
    let (_, axum::Json(created)) =
        handlers::create_article(user.clone(), State(state.clone()), article_payload("t", "c"))
            .await
            .unwrap();

    let axum::Json(first) =
        handlers::get_article(user.clone(), State(state.clone()), Path(created.id))
            .await
            .unwrap();
    let axum::Json(second) = handlers::get_article(user, State(state), Path(created.id))
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[test]
async fn create_article_rejects_empty_title() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;
    let err = handlers::create_article(user, State(state), article_payload("", "c"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::BadRequest);
}

#[test]
async fn get_missing_article_is_not_found() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;
    let err = handlers::get_article(user, State(state), Path(1))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

#[test]
async fn update_checks_payload_before_existence() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;

    // Malformed payload against a missing article: 400, not 404.
    let err = handlers::update_article(user, State(state), Path(999), article_payload("", ""))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::BadRequest);
}

#[test]
async fn update_of_missing_article_is_not_found() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;
    let err = handlers::update_article(user, State(state), Path(999), article_payload("t", "c"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

#[test]
async fn update_by_non_owner_is_forbidden_and_changes_nothing() {
    let state = test_state();
    let owner = seeded_user(&state, "chris").await;
    let intruder = seeded_user(&state, "swpp").await;

    let (_, axum::Json(created)) =
        handlers::create_article(owner, State(state.clone()), article_payload("t", "c"))
            .await
            .unwrap();

    let err = handlers::update_article(
        intruder,
        State(state.clone()),
        Path(created.id),
        article_payload("hacked", "hacked"),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::Forbidden);

    // The stored fields are untouched.
    let stored = state.repo.get_article(created.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "t");
    assert_eq!(stored.content, "c");
}

#[test]
async fn delete_by_non_owner_is_forbidden() {
    let state = test_state();
    let owner = seeded_user(&state, "chris").await;
    let intruder = seeded_user(&state, "swpp").await;

    let (_, axum::Json(created)) =
        handlers::create_article(owner, State(state.clone()), article_payload("t", "c"))
            .await
            .unwrap();

    let err = handlers::delete_article(intruder, State(state.clone()), Path(created.id))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Forbidden);
    assert!(state.repo.get_article(created.id).await.unwrap().is_some());
}

#[test]
async fn delete_cascades_to_comments() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;

    let (_, axum::Json(article)) =
        handlers::create_article(user.clone(), State(state.clone()), article_payload("t", "c"))
            .await
            .unwrap();
    let (_, axum::Json(comment)) = handlers::create_comment(
        user.clone(),
        State(state.clone()),
        Path(article.id),
        comment_payload("there is no one asked"),
    )
    .await
    .unwrap();

    let status = handlers::delete_article(user.clone(), State(state.clone()), Path(article.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    // Reading the orphaned comment must now be a 404.
    let err = handlers::get_comment(user, State(state), Path(comment.id))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

// --- COMMENT HANDLERS ---

#[test]
async fn comment_creation_checks_payload_before_article_existence() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;

    // Empty content against a missing article: payload first, so 400.
    let err = handlers::create_comment(user, State(state), Path(999), comment_payload(""))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::BadRequest);
}

#[test]
async fn comment_creation_under_missing_article_is_not_found() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;
    let err = handlers::create_comment(user, State(state), Path(999), comment_payload("hi"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

#[test]
async fn listing_comments_of_missing_article_is_not_found() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;
    let err = handlers::list_comments(user, State(state), Path(999))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

#[test]
async fn comment_lifecycle_under_an_article() {
    let state = test_state();
    let user = seeded_user(&state, "chris").await;

    let (_, axum::Json(article)) =
        handlers::create_article(user.clone(), State(state.clone()), article_payload("t", "c"))
            .await
            .unwrap();

    let (status, axum::Json(created)) = handlers::create_comment(
        user.clone(),
        State(state.clone()),
        Path(article.id),
        comment_payload("first"),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.article, article.id);
    assert_eq!(created.author, user.id);

    let axum::Json(listed) =
        handlers::list_comments(user.clone(), State(state.clone()), Path(article.id))
            .await
            .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].content, "first");

    let axum::Json(updated) = handlers::update_comment(
        user.clone(),
        State(state.clone()),
        Path(created.id),
        comment_payload("edited"),
    )
    .await
    .unwrap();
    assert_eq!(updated.content, "edited");
    assert_eq!(updated.id, created.id);

    let status = handlers::delete_comment(user.clone(), State(state.clone()), Path(created.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let err = handlers::get_comment(user, State(state), Path(created.id))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

#[test]
async fn comment_mutation_by_non_owner_is_forbidden() {
    let state = test_state();
    let owner = seeded_user(&state, "chris").await;
    let intruder = seeded_user(&state, "swpp").await;

    let (_, axum::Json(article)) =
        handlers::create_article(owner.clone(), State(state.clone()), article_payload("t", "c"))
            .await
            .unwrap();
    let (_, axum::Json(comment)) = handlers::create_comment(
        owner,
        State(state.clone()),
        Path(article.id),
        comment_payload("mine"),
    )
    .await
    .unwrap();

    let err = handlers::update_comment(
        intruder.clone(),
        State(state.clone()),
        Path(comment.id),
        comment_payload("not yours"),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::Forbidden);

    let err = handlers::delete_comment(intruder, State(state), Path(comment.id))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Forbidden);
}

// The extractor itself: an unknown or missing session token resolves to 401
// no matter what the rest of the request looks like.
#[test]
async fn stale_session_token_is_unauthenticated() {
    use axum::extract::FromRequestParts;

    let state = test_state();
    let request = axum::http::Request::builder()
        .header("cookie", format!("sessionid={}", Uuid::new_v4()))
        .body(())
        .unwrap();
    let (mut parts, _) = request.into_parts();

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Unauthenticated);
}
