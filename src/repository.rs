use crate::error::RepositoryError;
use crate::models::{Article, Comment, Session, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

type RepoResult<T> = Result<T, RepositoryError>;

/// Repository
///
/// The abstract contract for all persistence operations. Handlers interact
/// with the data layer exclusively through this trait, so the concrete
/// backend (Postgres in production, in-memory in tests) stays swappable.
///
/// Every method returns `Result`: persistence failures are surfaced to the
/// caller for classification, never defaulted away. Not-found is expressed
/// as `Ok(None)` / `Ok(false)`, keeping it distinct from a database fault.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Inserts a new user. A duplicate username surfaces as
    /// `RepositoryError::Conflict`.
    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<User>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    // --- Sessions ---
    /// Opens a session for the user and returns it, token included.
    async fn create_session(&self, user_id: Uuid) -> RepoResult<Session>;
    async fn get_session(&self, token: Uuid) -> RepoResult<Option<Session>>;
    /// Tears a session down. Returns false if no such token existed.
    async fn delete_session(&self, token: Uuid) -> RepoResult<bool>;

    // --- Articles ---
    /// All articles in insertion (id) order.
    async fn list_articles(&self) -> RepoResult<Vec<Article>>;
    async fn get_article(&self, id: i64) -> RepoResult<Option<Article>>;
    async fn create_article(&self, author_id: Uuid, title: &str, content: &str)
    -> RepoResult<Article>;
    /// Overwrites title and content. Ownership is decided by the handler
    /// beforehand; this only answers "did the row exist".
    async fn update_article(&self, id: i64, title: &str, content: &str)
    -> RepoResult<Option<Article>>;
    /// Deletes the article and every comment under it in one transaction,
    /// so the cascade is all-or-nothing. Returns false if the id was gone.
    async fn delete_article(&self, id: i64) -> RepoResult<bool>;

    // --- Comments ---
    /// All comments under one article in insertion (id) order.
    async fn list_comments(&self, article_id: i64) -> RepoResult<Vec<Comment>>;
    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>>;
    async fn create_comment(&self, article_id: i64, author_id: Uuid, content: &str)
    -> RepoResult<Comment>;
    async fn update_comment(&self, id: i64, content: &str) -> RepoResult<Option<Comment>>;
    async fn delete_comment(&self, id: i64) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by PostgreSQL.
/// Queries use the runtime-checked sqlx API so the crate builds without a
/// reachable database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a sqlx error, folding unique violations into `Conflict` so callers
/// can classify them without touching driver-specific error codes.
fn map_db_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        other => RepositoryError::Database(other),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, username, password_hash, created_at)
               VALUES ($1, $2, $3, NOW())
               RETURNING id, username, password_hash, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn create_session(&self, user_id: Uuid) -> RepoResult<Session> {
        sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions (token, user_id, created_at)
               VALUES ($1, $2, NOW())
               RETURNING token, user_id, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_session(&self, token: Uuid) -> RepoResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT token, user_id, created_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_session(&self, token: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_articles(&self) -> RepoResult<Vec<Article>> {
        sqlx::query_as::<_, Article>(
            r#"SELECT id, author_id, title, content, created_at, updated_at
               FROM articles ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_article(&self, id: i64) -> RepoResult<Option<Article>> {
        sqlx::query_as::<_, Article>(
            r#"SELECT id, author_id, title, content, created_at, updated_at
               FROM articles WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn create_article(
        &self,
        author_id: Uuid,
        title: &str,
        content: &str,
    ) -> RepoResult<Article> {
        sqlx::query_as::<_, Article>(
            r#"INSERT INTO articles (author_id, title, content, created_at, updated_at)
               VALUES ($1, $2, $3, NOW(), NOW())
               RETURNING id, author_id, title, content, created_at, updated_at"#,
        )
        .bind(author_id)
        .bind(title)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update_article(
        &self,
        id: i64,
        title: &str,
        content: &str,
    ) -> RepoResult<Option<Article>> {
        sqlx::query_as::<_, Article>(
            r#"UPDATE articles
               SET title = $2, content = $3, updated_at = NOW()
               WHERE id = $1
               RETURNING id, author_id, title, content, created_at, updated_at"#,
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_article(&self, id: i64) -> RepoResult<bool> {
        // Comments first, then the article, in one transaction: the caller
        // must never observe a half-applied cascade.
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        sqlx::query("DELETE FROM comments WHERE article_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, article_id: i64) -> RepoResult<Vec<Comment>> {
        sqlx::query_as::<_, Comment>(
            r#"SELECT id, article_id, author_id, content, created_at, updated_at
               FROM comments WHERE article_id = $1 ORDER BY id"#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(
            r#"SELECT id, article_id, author_id, content, created_at, updated_at
               FROM comments WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn create_comment(
        &self,
        article_id: i64,
        author_id: Uuid,
        content: &str,
    ) -> RepoResult<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"INSERT INTO comments (article_id, author_id, content, created_at, updated_at)
               VALUES ($1, $2, $3, NOW(), NOW())
               RETURNING id, article_id, author_id, content, created_at, updated_at"#,
        )
        .bind(article_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update_comment(&self, id: i64, content: &str) -> RepoResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(
            r#"UPDATE comments
               SET content = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING id, article_id, author_id, content, created_at, updated_at"#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_comment(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-Memory Implementation (For Tests) ---

#[derive(Default)]
struct MemoryStore {
    users: Vec<User>,
    sessions: Vec<Session>,
    articles: Vec<Article>,
    comments: Vec<Comment>,
    next_article_id: i64,
    next_comment_id: i64,
}

/// MemoryRepository
///
/// An in-process implementation of `Repository` used by the test suites, so
/// handler and HTTP-level behavior can be exercised without a running
/// Postgres instance. Ids are assigned sequentially from 1, matching the
/// serial columns of the Postgres schema.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<MemoryStore>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<User> {
        let mut store = self.store.lock().expect("memory store poisoned");
        if store.users.iter().any(|u| u.username == username) {
            return Err(RepositoryError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store.lock().expect("memory store poisoned");
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let store = self.store.lock().expect("memory store poisoned");
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_session(&self, user_id: Uuid) -> RepoResult<Session> {
        let mut store = self.store.lock().expect("memory store poisoned");
        let session = Session {
            token: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
        };
        store.sessions.push(session.clone());
        Ok(session)
    }

    async fn get_session(&self, token: Uuid) -> RepoResult<Option<Session>> {
        let store = self.store.lock().expect("memory store poisoned");
        Ok(store.sessions.iter().find(|s| s.token == token).cloned())
    }

    async fn delete_session(&self, token: Uuid) -> RepoResult<bool> {
        let mut store = self.store.lock().expect("memory store poisoned");
        let before = store.sessions.len();
        store.sessions.retain(|s| s.token != token);
        Ok(store.sessions.len() < before)
    }

    async fn list_articles(&self) -> RepoResult<Vec<Article>> {
        let store = self.store.lock().expect("memory store poisoned");
        Ok(store.articles.clone())
    }

    async fn get_article(&self, id: i64) -> RepoResult<Option<Article>> {
        let store = self.store.lock().expect("memory store poisoned");
        Ok(store.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn create_article(
        &self,
        author_id: Uuid,
        title: &str,
        content: &str,
    ) -> RepoResult<Article> {
        let mut store = self.store.lock().expect("memory store poisoned");
        store.next_article_id += 1;
        let now = Utc::now();
        let article = Article {
            id: store.next_article_id,
            author_id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.articles.push(article.clone());
        Ok(article)
    }

    async fn update_article(
        &self,
        id: i64,
        title: &str,
        content: &str,
    ) -> RepoResult<Option<Article>> {
        let mut store = self.store.lock().expect("memory store poisoned");
        match store.articles.iter_mut().find(|a| a.id == id) {
            Some(article) => {
                article.title = title.to_string();
                article.content = content.to_string();
                article.updated_at = Utc::now();
                Ok(Some(article.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_article(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store.lock().expect("memory store poisoned");
        let before = store.articles.len();
        store.articles.retain(|a| a.id != id);
        if store.articles.len() == before {
            return Ok(false);
        }
        store.comments.retain(|c| c.article_id != id);
        Ok(true)
    }

    async fn list_comments(&self, article_id: i64) -> RepoResult<Vec<Comment>> {
        let store = self.store.lock().expect("memory store poisoned");
        Ok(store
            .comments
            .iter()
            .filter(|c| c.article_id == article_id)
            .cloned()
            .collect())
    }

    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        let store = self.store.lock().expect("memory store poisoned");
        Ok(store.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn create_comment(
        &self,
        article_id: i64,
        author_id: Uuid,
        content: &str,
    ) -> RepoResult<Comment> {
        let mut store = self.store.lock().expect("memory store poisoned");
        store.next_comment_id += 1;
        let now = Utc::now();
        let comment = Comment {
            id: store.next_comment_id,
            article_id,
            author_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, content: &str) -> RepoResult<Option<Comment>> {
        let mut store = self.store.lock().expect("memory store poisoned");
        match store.comments.iter_mut().find(|c| c.id == id) {
            Some(comment) => {
                comment.content = content.to_string();
                comment.updated_at = Utc::now();
                Ok(Some(comment.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_comment(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store.lock().expect("memory store poisoned");
        let before = store.comments.len();
        store.comments.retain(|c| c.id != id);
        Ok(store.comments.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let repo = MemoryRepository::new();
        repo.create_user("chris", "hash").await.unwrap();
        let err = repo.create_user("chris", "hash").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict));
    }

    #[tokio::test]
    async fn article_ids_are_sequential() {
        let repo = MemoryRepository::new();
        let author = Uuid::new_v4();
        let first = repo.create_article(author, "a", "1").await.unwrap();
        let second = repo.create_article(author, "b", "2").await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn deleting_an_article_removes_its_comments() {
        let repo = MemoryRepository::new();
        let author = Uuid::new_v4();
        let article = repo.create_article(author, "t", "c").await.unwrap();
        let comment = repo
            .create_comment(article.id, author, "first")
            .await
            .unwrap();

        assert!(repo.delete_article(article.id).await.unwrap());
        assert!(repo.get_comment(comment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_missing_article_touches_nothing() {
        let repo = MemoryRepository::new();
        let author = Uuid::new_v4();
        let article = repo.create_article(author, "t", "c").await.unwrap();
        repo.create_comment(article.id, author, "still here")
            .await
            .unwrap();

        assert!(!repo.delete_article(article.id + 1).await.unwrap());
        assert_eq!(repo.list_comments(article.id).await.unwrap().len(), 1);
    }
}
