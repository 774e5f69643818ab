//! Repository for the `integrations` table.

use sqlx::PgPool;
use wfb_core::types::generate_id;

use crate::models::integration::{
    CreateIntegration, Integration, IntegrationOwner, UpdateIntegration,
};

const COLUMNS: &str = "\
    id, user_id, workspace_id, name, integration_type, config, \
    credentials_encrypted, created_at, updated_at";

/// Provides CRUD operations for integrations.
pub struct IntegrationRepo;

impl IntegrationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateIntegration,
    ) -> Result<Integration, sqlx::Error> {
        let query = format!(
            "INSERT INTO integrations \
                (id, user_id, workspace_id, name, integration_type, config, credentials_encrypted) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Integration>(&query)
            .bind(generate_id())
            .bind(&input.user_id)
            .bind(&input.workspace_id)
            .bind(&input.name)
            .bind(input.integration_type.as_str())
            .bind(&input.config)
            .bind(&input.credentials_encrypted)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Integration>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM integrations WHERE id = $1");
        sqlx::query_as::<_, Integration>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Vec<Integration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM integrations WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Integration>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Look up the owners of many integrations in one query.
    ///
    /// Ids with no matching row are simply absent from the result.
    pub async fn find_owners(
        pool: &PgPool,
        ids: &[String],
    ) -> Result<Vec<IntegrationOwner>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, IntegrationOwner>(
            "SELECT id, user_id FROM integrations WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: &str,
        input: &UpdateIntegration,
    ) -> Result<Option<Integration>, sqlx::Error> {
        let query = format!(
            "UPDATE integrations SET \
                name = COALESCE($2, name), \
                config = COALESCE($3, config), \
                credentials_encrypted = COALESCE($4, credentials_encrypted), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Integration>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.config)
            .bind(&input.credentials_encrypted)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM integrations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
