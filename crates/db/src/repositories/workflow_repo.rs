//! Repository for the `workflows` table.

use sqlx::types::Json;
use sqlx::PgPool;
use wfb_core::types::generate_id;
use wfb_core::workflow::{TriggerType, Visibility};

use crate::models::workflow::{CreateWorkflow, UpdateWorkflow, Workflow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, user_id, workspace_id, name, description, nodes, edges, \
    visibility, trigger_type, is_active, created_at, updated_at";

/// Provides CRUD operations for workflows.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// Insert a new workflow, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateWorkflow) -> Result<Workflow, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflows \
                (id, user_id, workspace_id, name, description, nodes, edges, visibility, trigger_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(generate_id())
            .bind(&input.user_id)
            .bind(&input.workspace_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(Json(&input.nodes))
            .bind(Json(&input.edges))
            .bind(input.visibility.as_str())
            .bind(input.trigger_type.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a workflow by its id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflows WHERE id = $1");
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's workflows, most recently updated first.
    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Workflow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflows WHERE user_id = $1 ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Update a workflow. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: &str,
        input: &UpdateWorkflow,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!(
            "UPDATE workflows SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                nodes = COALESCE($4, nodes), \
                edges = COALESCE($5, edges), \
                visibility = COALESCE($6, visibility), \
                trigger_type = COALESCE($7, trigger_type), \
                is_active = COALESCE($8, is_active), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.nodes.as_ref().map(Json))
            .bind(input.edges.as_ref().map(Json))
            .bind(input.visibility.map(Visibility::as_str))
            .bind(input.trigger_type.map(TriggerType::as_str))
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Delete a workflow. Executions and their logs go with it.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Copy a workflow under a new id. The copy is named `"<name> (Copy)"`
    /// and is always private.
    pub async fn duplicate(pool: &PgPool, id: &str) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflows \
                (id, user_id, workspace_id, name, description, nodes, edges, \
                 visibility, trigger_type, is_active) \
             SELECT $2, user_id, workspace_id, name || ' (Copy)', description, nodes, edges, \
                    'private', trigger_type, is_active \
             FROM workflows WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .bind(generate_id())
            .fetch_optional(pool)
            .await
    }

    /// Active workflows whose trigger node uses the given trigger type.
    pub async fn list_active_by_trigger(
        pool: &PgPool,
        trigger_type: TriggerType,
    ) -> Result<Vec<Workflow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflows \
             WHERE is_active AND trigger_type = $1 \
             ORDER BY created_at"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(trigger_type.as_str())
            .fetch_all(pool)
            .await
    }
}
