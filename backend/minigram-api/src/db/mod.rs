/// Database access layer
///
/// This module provides:
/// - Store traits for users, posts, likes, comments and follows
/// - Postgres repositories implementing them
/// - An in-memory implementation with the same constraint semantics
/// - Connection pooling and embedded migrations
pub mod comment_repo;
pub mod follow_repo;
pub mod like_repo;
pub mod memory;
pub mod post_repo;
pub mod user_repo;

pub use comment_repo::PgCommentRepository;
pub use follow_repo::PgFollowRepository;
pub use like_repo::PgLikeRepository;
pub use memory::InMemoryStore;
pub use post_repo::PgPostRepository;
pub use user_repo::PgUserRepository;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{Comment, Follow, Like, Post, PostStats, ProfileUpdate, User, UserStats};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// User Directory storage
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>>;

    /// Batch lookup used when joining authors onto posts and comments
    async fn find_many(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>>;

    /// Create the user for an external identity, or return the existing row
    /// unchanged
    async fn upsert_from_identity(&self, external_id: &str, display_name: &str) -> Result<User>;

    /// Apply the present fields of `update`; `None` when the user is absent
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<User>>;

    async fn stats(&self, id: Uuid) -> Result<UserStats>;

    /// Case-insensitive substring match on display name
    async fn search_by_name(&self, query: &str, limit: i64) -> Result<Vec<User>>;
}

/// Content Store
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert(&self, author_id: Uuid, image_url: &str, caption: Option<&str>) -> Result<Post>;

    async fn find(&self, id: Uuid) -> Result<Option<Post>>;

    /// Newest first, ties broken by id descending
    async fn list(&self, author_id: Option<Uuid>, limit: i64, offset: i64) -> Result<Vec<Post>>;

    /// Delete a post together with its likes and comments
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Live counters for each requested post; posts without rows are omitted
    async fn stats(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, PostStats>>;

    /// Case-insensitive substring match on caption, newest first
    async fn search_by_caption(&self, query: &str, limit: i64) -> Result<Vec<Post>>;
}

/// Likes half of the Interaction Store
#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Fails with `Conflict` when the pair exists and `NotFound` when the post
    /// does not
    async fn insert(&self, post_id: Uuid, user_id: Uuid) -> Result<Like>;

    async fn delete(&self, post_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn exists(&self, post_id: Uuid, user_id: Uuid) -> Result<bool>;
}

/// Comments half of the Interaction Store
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Fails with `NotFound` when the post does not exist
    async fn insert(&self, post_id: Uuid, author_id: Uuid, content: &str) -> Result<Comment>;

    async fn find(&self, id: Uuid) -> Result<Option<Comment>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Oldest first
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>>;
}

/// Social Graph Store
#[async_trait]
pub trait FollowStore: Send + Sync {
    /// Fails with `Conflict` on a duplicate edge
    async fn insert(&self, follower_id: Uuid, followee_id: Uuid) -> Result<Follow>;

    async fn delete(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool>;

    async fn exists(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool>;
}

/// The full set of stores the services run against
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub likes: Arc<dyn LikeStore>,
    pub comments: Arc<dyn CommentStore>,
    pub follows: Arc<dyn FollowStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            likes: Arc::new(PgLikeRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool.clone())),
            follows: Arc::new(PgFollowRepository::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            posts: store.clone(),
            likes: store.clone(),
            comments: store.clone(),
            follows: store,
        }
    }
}

/// Create a PostgreSQL connection pool
pub async fn create_pool(config: &DatabaseConfig) -> std::result::Result<PgPool, sqlx::Error> {
    tracing::debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Creating database pool"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await
}

/// Apply the embedded migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Build an `ILIKE` pattern matching `query` as a raw substring.
///
/// `%`, `_` and `\` in the query are escaped so they match literally.
pub(crate) fn substring_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_pattern_escapes_wildcards() {
        assert_eq!(substring_pattern("cat"), "%cat%");
        assert_eq!(substring_pattern("100%"), "%100\\%%");
        assert_eq!(substring_pattern("a_b"), "%a\\_b%");
        assert_eq!(substring_pattern("c:\\d"), "%c:\\\\d%");
    }
}
