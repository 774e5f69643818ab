//! Webhook trigger.
//!
//! Authenticated by API key rather than session. The run is started and
//! the caller gets the execution id back straight away; the graph is walked
//! on a spawned task.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use wfb_core::error::CoreError;
use wfb_core::workflow::TriggerType;
use wfb_db::repositories::WorkflowRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::workflows::check_integrations;
use crate::middleware::api_key::ApiKeyUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub execution_id: String,
    pub status: String,
}

/// POST /api/v1/workflows/{id}/webhook
///
/// The raw JSON body becomes the trigger input; an empty body is `{}`.
pub async fn trigger_webhook(
    caller: ApiKeyUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let workflow = WorkflowRepo::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Workflow",
                id: id.clone(),
            })
        })?;

    if !workflow.is_owned_by(&caller.user_id) {
        tracing::warn!(
            workflow_id = %id,
            api_key_id = %caller.key_id,
            "Webhook key does not belong to the workflow owner"
        );
        return Err(AppError::Core(CoreError::Forbidden(
            "API key does not have access to this workflow".into(),
        )));
    }

    let input: Value = if body.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| AppError::BadRequest("Request body must be valid JSON".into()))?
    };

    check_integrations(&state, &workflow.nodes.0, &workflow.user_id).await?;

    let prepared = state
        .orchestrator
        .begin(&workflow, TriggerType::Webhook, input)
        .await?;
    let response = WebhookResponse {
        execution_id: prepared.execution_id().to_string(),
        status: prepared.execution().status.clone(),
    };

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator.drive(prepared).await {
            tracing::error!(error = %e, "Webhook execution failed");
        }
    });

    tracing::info!(
        workflow_id = %id,
        execution_id = %response.execution_id,
        api_key_id = %caller.key_id,
        "Webhook execution started"
    );

    Ok(Json(response))
}
