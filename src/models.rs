use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

// --- Core Application Records (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. The credential is
/// stored as an Argon2id PHC string and never serialized outward.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    // Unique login name, immutable after signup.
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Session
///
/// A server-side login record from the `sessions` table. The opaque token
/// travels in the `sessionid` cookie; nothing else about the session is
/// visible to the client.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Article
///
/// An article record from the `articles` table. `author_id` is set at
/// creation and never reassigned; only the author may mutate or delete the
/// record. Deleting an article removes its comments with it.
#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: i64,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment record from the `comments` table. `article_id` must reference
/// an existing article at creation time and is immutable, as is `author_id`.
#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CredentialsRequest
///
/// Input payload shared by POST /api/signup and POST /api/signin. The
/// password only ever flows into the Argon2 hasher or verifier; it is not
/// persisted or logged in clear text.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

impl CredentialsRequest {
    /// Both fields must be present (enforced by deserialization) and
    /// non-empty.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ApiError::BadRequest);
        }
        Ok(())
    }
}

/// ArticleRequest
///
/// Input payload for creating (POST /api/article) or fully replacing
/// (PUT /api/article/{id}) an article.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArticleRequest {
    pub title: String,
    pub content: String,
}

impl ArticleRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.is_empty() || self.content.is_empty() {
            return Err(ApiError::BadRequest);
        }
        Ok(())
    }
}

/// CommentRequest
///
/// Input payload for creating or replacing a comment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub content: String,
}

impl CommentRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.content.is_empty() {
            return Err(ApiError::BadRequest);
        }
        Ok(())
    }
}

// --- Response Projections (Output Schemas) ---

/// ArticleSummary
///
/// The read projection served by the article collection listing and by
/// GET /api/article/{id}: the id is carried in the URL, not the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ArticleSummary {
    pub title: String,
    pub content: String,
    /// Author id (the owner, fixed at creation).
    pub author: Uuid,
}

impl From<Article> for ArticleSummary {
    fn from(article: Article) -> Self {
        Self {
            title: article.title,
            content: article.content,
            author: article.author_id,
        }
    }
}

/// ArticleResponse
///
/// The full representation returned by article create and update, including
/// the assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: Uuid,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            content: article.content,
            author: article.author_id,
        }
    }
}

/// CommentSummary
///
/// The projection served by the per-article comment listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommentSummary {
    /// Id of the article the comment belongs to.
    pub article: i64,
    pub content: String,
    pub author: Uuid,
}

impl From<Comment> for CommentSummary {
    fn from(comment: Comment) -> Self {
        Self {
            article: comment.article_id,
            content: comment.content,
            author: comment.author_id,
        }
    }
}

/// CommentResponse
///
/// The full comment representation returned by comment create, read, and
/// update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: i64,
    pub article: i64,
    pub content: String,
    pub author: Uuid,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            article: comment.article_id,
            content: comment.content,
            author: comment.author_id,
        }
    }
}
