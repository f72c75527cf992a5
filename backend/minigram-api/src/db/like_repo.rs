use super::LikeStore;
use crate::error::{is_foreign_key_violation, is_unique_violation, AppError, Result};
use crate::models::Like;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed likes
#[derive(Clone)]
pub struct PgLikeRepository {
    pool: PgPool,
}

impl PgLikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeStore for PgLikeRepository {
    async fn insert(&self, post_id: Uuid, user_id: Uuid) -> Result<Like> {
        sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (post_id, user_id)
            VALUES ($1, $2)
            RETURNING id, post_id, user_id, created_at
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Post already liked".to_string())
            } else if is_foreign_key_violation(&e) {
                AppError::NotFound("Post not found".to_string())
            } else {
                e.into()
            }
        })
    }

    async fn delete(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM likes
                WHERE post_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
