use super::{substring_pattern, PostStore};
use crate::error::Result;
use crate::models::{Post, PostStats};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const POST_COLUMNS: &str = "id, author_id, image_url, caption, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PostStatsRow {
    post_id: Uuid,
    likes_count: i64,
    comments_count: i64,
}

/// Postgres-backed content store
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostRepository {
    async fn insert(&self, author_id: Uuid, image_url: &str, caption: Option<&str>) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (author_id, image_url, caption)
            VALUES ($1, $2, $3)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(author_id)
        .bind(image_url)
        .bind(caption)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn list(&self, author_id: Option<Uuid>, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE ($1::uuid IS NULL OR author_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        // Likes and comments go with the row via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, PostStats>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, PostStatsRow>(
            r#"
            SELECT post_id, likes_count, comments_count
            FROM post_stats
            WHERE post_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.post_id,
                    PostStats {
                        likes_count: row.likes_count,
                        comments_count: row.comments_count,
                    },
                )
            })
            .collect())
    }

    async fn search_by_caption(&self, query: &str, limit: i64) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE caption ILIKE $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(substring_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
