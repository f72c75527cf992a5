use super::{substring_pattern, UserStore};
use crate::error::Result;
use crate::models::{ProfileUpdate, User, UserStats};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, external_id, display_name, avatar_url, created_at";

/// Postgres-backed user directory
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    async fn upsert_from_identity(&self, external_id: &str, display_name: &str) -> Result<User> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (external_id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (external_id) DO UPDATE
            SET external_id = EXCLUDED.external_id
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(external_id)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET display_name = COALESCE($2, display_name),
                avatar_url = COALESCE($3, avatar_url)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.avatar_url.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn stats(&self, id: Uuid) -> Result<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT posts_count, followers_count, following_count
            FROM user_stats
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stats.unwrap_or_default())
    }

    async fn search_by_name(&self, query: &str, limit: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE display_name ILIKE $1
            ORDER BY display_name ASC, id ASC
            LIMIT $2
            "#
        ))
        .bind(substring_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
