//! Repository for the `executions` table.
//!
//! Rows in a terminal status (`completed`, `error`) are never modified:
//! [`ExecutionRepo::update`] filters them out in its `WHERE` clause.

use sqlx::PgPool;
use wfb_core::status::ExecutionStatus;
use wfb_core::types::{generate_id, Timestamp};
use wfb_core::workflow::TriggerType;

use crate::models::execution::{CreateExecution, Execution, UpdateExecution};

const COLUMNS: &str = "\
    id, workflow_id, user_id, status, trigger_type, input, output, error, \
    started_at, completed_at, duration_ms, created_at, updated_at";

/// Maximum rows returned by [`ExecutionRepo::list_for_workflow`].
pub const LIST_LIMIT: i64 = 100;

/// Provides persistence for workflow executions.
pub struct ExecutionRepo;

impl ExecutionRepo {
    /// Insert a new `pending` execution.
    pub async fn create(pool: &PgPool, input: &CreateExecution) -> Result<Execution, sqlx::Error> {
        let query = format!(
            "INSERT INTO executions (id, workflow_id, user_id, status, trigger_type, input) \
             VALUES ($1, $2, $3, 'pending', $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(generate_id())
            .bind(&input.workflow_id)
            .bind(&input.user_id)
            .bind(input.trigger_type.as_str())
            .bind(&input.input)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM executions WHERE id = $1");
        sqlx::query_as::<_, Execution>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Patch a non-terminal execution.
    ///
    /// Returns `None` if the row does not exist or is already terminal.
    pub async fn update(
        pool: &PgPool,
        id: &str,
        input: &UpdateExecution,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!(
            "UPDATE executions SET \
                status = COALESCE($2, status), \
                output = COALESCE($3, output), \
                error = COALESCE($4, error), \
                started_at = COALESCE($5, started_at), \
                completed_at = COALESCE($6, completed_at), \
                duration_ms = COALESCE($7, duration_ms), \
                updated_at = NOW() \
             WHERE id = $1 AND status NOT IN ('completed', 'error') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(id)
            .bind(input.status.map(ExecutionStatus::as_str))
            .bind(&input.output)
            .bind(&input.error)
            .bind(input.started_at)
            .bind(input.completed_at)
            .bind(input.duration_ms)
            .fetch_optional(pool)
            .await
    }

    /// Latest executions of a workflow, newest first, capped at [`LIST_LIMIT`].
    pub async fn list_for_workflow(
        pool: &PgPool,
        workflow_id: &str,
    ) -> Result<Vec<Execution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM executions \
             WHERE workflow_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(workflow_id)
            .bind(LIST_LIMIT)
            .fetch_all(pool)
            .await
    }

    /// Delete every execution of a workflow. Logs cascade. Returns the count.
    pub async fn delete_for_workflow(pool: &PgPool, workflow_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM executions WHERE workflow_id = $1")
            .bind(workflow_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// When the most recent execution of the given trigger type was created.
    pub async fn last_created_at(
        pool: &PgPool,
        workflow_id: &str,
        trigger_type: TriggerType,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<Timestamp>>(
            "SELECT MAX(created_at) FROM executions \
             WHERE workflow_id = $1 AND trigger_type = $2",
        )
        .bind(workflow_id)
        .bind(trigger_type.as_str())
        .fetch_one(pool)
        .await
    }
}
