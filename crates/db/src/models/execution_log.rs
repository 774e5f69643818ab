//! Per-node execution log entity and insert DTO. Log rows are immutable.

use serde::Serialize;
use sqlx::FromRow;
use wfb_core::status::NodeStatus;
use wfb_core::types::{EntityId, Timestamp};

/// A row from the `execution_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub id: EntityId,
    pub execution_id: EntityId,
    pub sequence: i32,
    pub node_id: String,
    pub node_label: String,
    pub node_type: String,
    pub status: String,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    #[serde(rename = "duration")]
    pub duration_ms: Option<i64>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateExecutionLog {
    pub execution_id: EntityId,
    pub node_id: String,
    pub node_label: String,
    pub node_type: String,
    pub status: NodeStatus,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub duration_ms: Option<i64>,
}
