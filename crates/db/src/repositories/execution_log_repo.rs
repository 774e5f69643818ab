//! Repository for the `execution_logs` table (append-only).

use sqlx::PgPool;
use wfb_core::types::generate_id;

use crate::models::execution_log::{CreateExecutionLog, ExecutionLog};

const COLUMNS: &str = "\
    id, execution_id, sequence, node_id, node_label, node_type, status, \
    input, output, error, started_at, completed_at, duration_ms, created_at";

pub struct ExecutionLogRepo;

impl ExecutionLogRepo {
    /// Append a log row. `sequence` is the next index for the execution,
    /// starting at 0.
    pub async fn append(
        pool: &PgPool,
        input: &CreateExecutionLog,
    ) -> Result<ExecutionLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO execution_logs \
                (id, execution_id, sequence, node_id, node_label, node_type, status, \
                 input, output, error, started_at, completed_at, duration_ms) \
             VALUES ($1, $2, \
                     (SELECT COALESCE(MAX(sequence) + 1, 0) FROM execution_logs WHERE execution_id = $2), \
                     $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExecutionLog>(&query)
            .bind(generate_id())
            .bind(&input.execution_id)
            .bind(&input.node_id)
            .bind(&input.node_label)
            .bind(&input.node_type)
            .bind(input.status.as_str())
            .bind(&input.input)
            .bind(&input.output)
            .bind(&input.error)
            .bind(input.started_at)
            .bind(input.completed_at)
            .bind(input.duration_ms)
            .fetch_one(pool)
            .await
    }

    /// All log rows of an execution in invocation order.
    pub async fn list_for_execution(
        pool: &PgPool,
        execution_id: &str,
    ) -> Result<Vec<ExecutionLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM execution_logs \
             WHERE execution_id = $1 \
             ORDER BY sequence"
        );
        sqlx::query_as::<_, ExecutionLog>(&query)
            .bind(execution_id)
            .fetch_all(pool)
            .await
    }
}
