//! Handlers for workflow CRUD and manual execution.
//!
//! Workflows are owner-scoped: only the owner may change, duplicate or run
//! one. Non-owners may read a `public` workflow with its integration
//! references stripped.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::types::Json as DbJson;
use validator::Validate;
use wfb_core::error::CoreError;
use wfb_core::workflow::{self, Edge, Node, TriggerType, Visibility};
use wfb_db::models::workflow::{CreateWorkflow, UpdateWorkflow, Workflow};
use wfb_db::repositories::WorkflowRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub workspace_id: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflowRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub nodes: Option<Vec<Node>>,
    pub edges: Option<Vec<Edge>>,
    pub visibility: Option<Visibility>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub input: Option<Value>,
}

/// A workflow as returned to a caller, flagged with whether they own it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResponse {
    #[serde(flatten)]
    pub workflow: Workflow,
    pub is_owner: bool,
}

impl WorkflowResponse {
    fn owned(workflow: Workflow) -> Self {
        Self {
            workflow,
            is_owner: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(id: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Workflow",
        id: id.to_string(),
    })
}

/// Load a workflow the caller owns: `404` when it does not exist, `403` when
/// it belongs to someone else.
pub(crate) async fn load_owned(
    state: &AppState,
    id: &str,
    user: &AuthUser,
) -> AppResult<Workflow> {
    let workflow = WorkflowRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if !workflow.is_owned_by(&user.user_id) {
        tracing::warn!(workflow_id = %id, user_id = %user.user_id, "Workflow access denied");
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this workflow".into(),
        )));
    }
    Ok(workflow)
}

/// Reject nodes that reference integrations the owner cannot use.
pub(crate) async fn check_integrations(
    state: &AppState,
    nodes: &[Node],
    owner_user_id: &str,
) -> AppResult<()> {
    let result = state.validator.validate(nodes, owner_user_id).await?;
    if result.valid {
        Ok(())
    } else {
        Err(AppError::InvalidIntegrations(result))
    }
}

fn check_structure(nodes: &[Node], edges: &[Edge]) -> AppResult<()> {
    workflow::check_structure(nodes, edges)
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/workflows
pub async fn list_workflows(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let workflows = WorkflowRepo::list_for_user(&state.pool, &user.user_id).await?;
    Ok(Json(workflows))
}

/// POST /api/v1/workflows
///
/// An empty node list is replaced by a single manual trigger.
pub async fn create_workflow(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateWorkflowRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let nodes = workflow::ensure_trigger(input.nodes);
    check_structure(&nodes, &input.edges)?;
    check_integrations(&state, &nodes, &user.user_id).await?;

    let trigger_type = workflow::trigger_type(&nodes);
    let created = WorkflowRepo::create(
        &state.pool,
        &CreateWorkflow {
            user_id: user.user_id.clone(),
            workspace_id: input.workspace_id,
            name: input.name.trim().to_string(),
            description: input.description,
            nodes,
            edges: input.edges,
            visibility: input.visibility,
            trigger_type,
        },
    )
    .await?;

    tracing::info!(
        workflow_id = %created.id,
        user_id = %user.user_id,
        nodes = created.nodes.0.len(),
        trigger = trigger_type.as_str(),
        "Workflow created"
    );

    Ok((StatusCode::CREATED, Json(WorkflowResponse::owned(created))))
}

/// GET /api/v1/workflows/{id}
///
/// Anonymous callers and non-owners only see `public` workflows, sanitized.
pub async fn get_workflow(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let mut workflow = WorkflowRepo::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    let is_owner = user.is_some_and(|u| workflow.is_owned_by(&u.user_id));
    if !is_owner {
        if workflow.visibility() != Visibility::Public {
            return Err(not_found(&id));
        }
        workflow.nodes = DbJson(workflow::sanitize_for_public(&workflow.nodes.0));
    }

    Ok(Json(WorkflowResponse { workflow, is_owner }))
}

/// PATCH /api/v1/workflows/{id}
pub async fn update_workflow(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateWorkflowRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let existing = load_owned(&state, &id, &user).await?;

    let mut trigger_type: Option<TriggerType> = None;
    if input.nodes.is_some() || input.edges.is_some() {
        let nodes = input.nodes.as_deref().unwrap_or(&existing.nodes.0);
        let edges = input.edges.as_deref().unwrap_or(&existing.edges.0);
        check_structure(nodes, edges)?;
    }
    if let Some(nodes) = &input.nodes {
        check_integrations(&state, nodes, &user.user_id).await?;
        trigger_type = Some(workflow::trigger_type(nodes));
    }

    let updated = WorkflowRepo::update(
        &state.pool,
        &id,
        &UpdateWorkflow {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            nodes: input.nodes,
            edges: input.edges,
            visibility: input.visibility,
            trigger_type,
            is_active: input.is_active,
        },
    )
    .await?
    .ok_or_else(|| not_found(&id))?;

    tracing::info!(workflow_id = %id, user_id = %user.user_id, "Workflow updated");

    Ok(Json(WorkflowResponse::owned(updated)))
}

/// DELETE /api/v1/workflows/{id}
///
/// Executions and their logs go with it.
pub async fn delete_workflow(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    load_owned(&state, &id, &user).await?;

    if !WorkflowRepo::delete(&state.pool, &id).await? {
        return Err(not_found(&id));
    }

    tracing::info!(workflow_id = %id, user_id = %user.user_id, "Workflow deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/workflows/{id}/duplicate
pub async fn duplicate_workflow(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    load_owned(&state, &id, &user).await?;

    let copy = WorkflowRepo::duplicate(&state.pool, &id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    tracing::info!(
        workflow_id = %id,
        copy_id = %copy.id,
        user_id = %user.user_id,
        "Workflow duplicated"
    );

    Ok((StatusCode::CREATED, Json(WorkflowResponse::owned(copy))))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows/{id}/execute
///
/// Runs the workflow to completion. The body is optional; `input` defaults
/// to `{}`.
pub async fn execute_workflow(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let request: ExecuteRequest = if body.is_empty() {
        ExecuteRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let workflow = load_owned(&state, &id, &user).await?;
    check_integrations(&state, &workflow.nodes.0, &workflow.user_id).await?;

    let input = request.input.unwrap_or_else(|| json!({}));
    let outcome = state
        .orchestrator
        .run(&workflow, TriggerType::Manual, input)
        .await?;

    Ok(Json(outcome))
}
