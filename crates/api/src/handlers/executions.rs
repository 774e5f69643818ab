//! Handlers for execution history, logs and status polling.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use wfb_core::error::CoreError;
use wfb_db::models::execution::Execution;
use wfb_db::models::execution_log::ExecutionLog;
use wfb_db::repositories::{ExecutionLogRepo, ExecutionRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::workflows::load_owned;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteExecutionsResponse {
    pub success: bool,
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
pub struct ExecutionLogsResponse {
    pub execution: Execution,
    pub logs: Vec<ExecutionLog>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatusEntry {
    pub node_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatusResponse {
    pub status: String,
    pub node_statuses: Vec<NodeStatusEntry>,
}

/// Load an execution started by the caller.
async fn load_owned_execution(
    state: &AppState,
    id: &str,
    user: &AuthUser,
) -> AppResult<Execution> {
    let execution = ExecutionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Execution",
                id: id.to_string(),
            })
        })?;

    if execution.user_id != user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this execution".into(),
        )));
    }
    Ok(execution)
}

// ---------------------------------------------------------------------------
// Per workflow
// ---------------------------------------------------------------------------

/// GET /api/v1/workflows/{id}/executions
///
/// The most recent executions, newest first.
pub async fn list_executions(
    user: AuthUser,
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, &workflow_id, &user).await?;
    let executions = ExecutionRepo::list_for_workflow(&state.pool, &workflow_id).await?;
    Ok(Json(executions))
}

/// DELETE /api/v1/workflows/{id}/executions
pub async fn delete_executions(
    user: AuthUser,
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, &workflow_id, &user).await?;
    let deleted_count = state
        .orchestrator
        .store()
        .delete_executions(&workflow_id)
        .await?;

    tracing::info!(
        workflow_id = %workflow_id,
        user_id = %user.user_id,
        deleted_count,
        "Execution history cleared"
    );

    Ok(Json(DeleteExecutionsResponse {
        success: true,
        deleted_count,
    }))
}

// ---------------------------------------------------------------------------
// Per execution
// ---------------------------------------------------------------------------

/// GET /api/v1/executions/{id}/logs
pub async fn get_execution_logs(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let execution = load_owned_execution(&state, &id, &user).await?;
    let logs = ExecutionLogRepo::list_for_execution(&state.pool, &id).await?;
    Ok(Json(ExecutionLogsResponse { execution, logs }))
}

/// GET /api/v1/executions/{id}/status
///
/// Lightweight poll target: the execution status plus the status of every
/// node logged so far.
pub async fn get_execution_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let execution = load_owned_execution(&state, &id, &user).await?;
    let logs = ExecutionLogRepo::list_for_execution(&state.pool, &id).await?;

    let node_statuses = logs
        .into_iter()
        .map(|log| NodeStatusEntry {
            node_id: log.node_id,
            status: log.status,
        })
        .collect();

    Ok(Json(ExecutionStatusResponse {
        status: execution.status,
        node_statuses,
    }))
}
