use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use uuid::Uuid;

use crate::{error::ApiError, repository::RepositoryState};

/// Cookie carrying the opaque session token. HttpOnly: the client never
/// reads it, it only rides along on requests.
pub const SESSION_COOKIE: &str = "sessionid";

/// Cookie carrying the anti-forgery token. Deliberately not HttpOnly: the
/// client reads it and echoes it back in the header below on unsafe verbs.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Header the anti-forgery middleware compares against the cookie.
pub const CSRF_HEADER: &str = "x-csrftoken";

/// AuthUser
///
/// The resolved identity of an authenticated request: the explicit context
/// object every protected handler receives. Carries the session token so
/// signout can tear the session down.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub session_token: Uuid,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's `FromRequestParts`, making `AuthUser` usable as a
/// function argument in any protected handler. Extraction resolves the
/// repository from the application state, reads the `sessionid` cookie,
/// looks the session up, and loads the owning user.
///
/// Rejection is always `ApiError::Unauthenticated` (401): a missing or
/// unparsable cookie, an unknown token, and a user deleted after the
/// session was opened are indistinguishable to the caller.
///
/// Extractors run before the request body is read, so an unauthenticated
/// caller receives 401 even when the payload is malformed or the target id
/// does not exist.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);

        let token = cookie_value(&parts.headers, SESSION_COOKIE)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or(ApiError::Unauthenticated)?;

        let session = repo
            .get_session(token)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        let user = repo
            .get_user(session.user_id)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
            session_token: token,
        })
    }
}

// --- Cookie Helpers ---

/// Extracts a named cookie's value from the `Cookie` request header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(token: Uuid) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value expiring the session cookie on signout.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
}

/// `Set-Cookie` value carrying a freshly issued anti-forgery token.
pub fn csrf_cookie(token: Uuid) -> String {
    format!("{CSRF_COOKIE}={token}; Path=/; SameSite=Lax")
}

// --- Password Hashing ---

/// Hashes a plaintext password with Argon2id and a random salt. Returns the
/// PHC-formatted string, which embeds algorithm parameters and salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verifies a plaintext password against a stored PHC string. `Ok(false)`
/// means a well-formed hash that simply does not match.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
