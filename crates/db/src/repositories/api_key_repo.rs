//! Repository for the `api_keys` table.

use sqlx::PgPool;
use wfb_core::types::generate_id;

use crate::models::api_key::{ApiKey, ApiKeyOwner};

const COLUMNS: &str = "id, user_id, name, key_hash, key_prefix, created_at, last_used_at";

/// Provides CRUD operations for webhook API keys.
pub struct ApiKeyRepo;

impl ApiKeyRepo {
    /// Store a new key. Only the hash and display prefix are persisted.
    pub async fn create(
        pool: &PgPool,
        user_id: &str,
        name: Option<&str>,
        key_hash: &str,
        key_prefix: &str,
    ) -> Result<ApiKey, sqlx::Error> {
        let query = format!(
            "INSERT INTO api_keys (id, user_id, name, key_hash, key_prefix) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(generate_id())
            .bind(user_id)
            .bind(name)
            .bind(key_hash)
            .bind(key_prefix)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<ApiKey>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a key belonging to `user_id`. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Resolve a key by its SHA-256 hash and stamp `last_used_at`.
    pub async fn validate(
        pool: &PgPool,
        key_hash: &str,
    ) -> Result<Option<ApiKeyOwner>, sqlx::Error> {
        sqlx::query_as::<_, ApiKeyOwner>(
            "UPDATE api_keys SET last_used_at = NOW() \
             WHERE key_hash = $1 \
             RETURNING id, user_id",
        )
        .bind(key_hash)
        .fetch_optional(pool)
        .await
    }
}
