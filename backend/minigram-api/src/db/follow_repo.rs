use super::FollowStore;
use crate::error::{is_unique_violation, AppError, Result};
use crate::models::Follow;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed social graph
#[derive(Clone)]
pub struct PgFollowRepository {
    pool: PgPool,
}

impl PgFollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowStore for PgFollowRepository {
    async fn insert(&self, follower_id: Uuid, followee_id: Uuid) -> Result<Follow> {
        sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (follower_id, followee_id)
            VALUES ($1, $2)
            RETURNING id, follower_id, followee_id, created_at
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Already following this user".to_string())
            } else {
                e.into()
            }
        })
    }

    async fn delete(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
                .bind(follower_id)
                .bind(followee_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM follows
                WHERE follower_id = $1 AND followee_id = $2
            )
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
