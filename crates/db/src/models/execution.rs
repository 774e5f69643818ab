//! Execution entity and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use wfb_core::status::ExecutionStatus;
use wfb_core::types::{EntityId, Timestamp};
use wfb_core::workflow::TriggerType;

/// A row from the `executions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: EntityId,
    pub workflow_id: EntityId,
    pub user_id: String,
    pub status: String,
    pub trigger_type: String,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    #[serde(rename = "duration")]
    pub duration_ms: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Execution {
    pub fn status(&self) -> Option<ExecutionStatus> {
        ExecutionStatus::parse(&self.status)
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_some_and(ExecutionStatus::is_terminal)
    }
}

/// DTO for inserting an execution. New rows always start `pending`.
#[derive(Debug, Clone)]
pub struct CreateExecution {
    pub workflow_id: EntityId,
    pub user_id: String,
    pub trigger_type: TriggerType,
    pub input: Option<serde_json::Value>,
}

/// Patch applied to a non-terminal execution.
#[derive(Debug, Clone, Default)]
pub struct UpdateExecution {
    pub status: Option<ExecutionStatus>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub duration_ms: Option<i64>,
}
