//! Handlers for integration management.
//!
//! Secrets are write-only: they are encrypted on the way in and never
//! returned. Another user's integration is reported as not found.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;
use wfb_core::crypto;
use wfb_core::error::CoreError;
use wfb_core::integrations::IntegrationType;
use wfb_db::models::integration::{CreateIntegration, Integration, UpdateIntegration};
use wfb_db::repositories::IntegrationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntegrationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    pub workspace_id: Option<String>,
    /// Non-secret settings, returned on reads.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Secret settings, stored encrypted.
    #[serde(default)]
    pub credentials: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIntegrationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub config: Option<Map<String, Value>>,
    /// Replaces the stored secrets entirely.
    pub credentials: Option<Map<String, Value>>,
}

fn not_found(id: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Integration",
        id: id.to_string(),
    })
}

fn seal(state: &AppState, secrets: Map<String, Value>) -> AppResult<String> {
    crypto::encrypt(&Value::Object(secrets).to_string(), &state.config.encryption_key)
        .map_err(|e| AppError::InternalError(format!("Failed to encrypt credentials: {e}")))
}

async fn load_owned(state: &AppState, id: &str, user: &AuthUser) -> AppResult<Integration> {
    IntegrationRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|i| i.user_id == user.user_id)
        .ok_or_else(|| not_found(id))
}

/// GET /api/v1/integrations
pub async fn list_integrations(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let integrations = IntegrationRepo::list_for_user(&state.pool, &user.user_id).await?;
    Ok(Json(integrations))
}

/// POST /api/v1/integrations
pub async fn create_integration(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateIntegrationRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let integration_type = IntegrationType::parse(&input.integration_type).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Unsupported integration type: '{}'",
            input.integration_type
        ))
    })?;

    let credentials_encrypted = seal(&state, input.credentials)?;
    let created = IntegrationRepo::create(
        &state.pool,
        &CreateIntegration {
            user_id: user.user_id.clone(),
            workspace_id: input.workspace_id,
            name: input.name.trim().to_string(),
            integration_type,
            config: Value::Object(input.config),
            credentials_encrypted,
        },
    )
    .await?;

    tracing::info!(
        integration_id = %created.id,
        integration_type = integration_type.as_str(),
        user_id = %user.user_id,
        "Integration created"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/integrations/{id}
pub async fn get_integration(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let integration = load_owned(&state, &id, &user).await?;
    Ok(Json(integration))
}

/// PATCH /api/v1/integrations/{id}
pub async fn update_integration(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateIntegrationRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    load_owned(&state, &id, &user).await?;

    let credentials_encrypted = input
        .credentials
        .map(|secrets| seal(&state, secrets))
        .transpose()?;

    let updated = IntegrationRepo::update(
        &state.pool,
        &id,
        &UpdateIntegration {
            name: input.name.map(|n| n.trim().to_string()),
            config: input.config.map(Value::Object),
            credentials_encrypted,
        },
    )
    .await?
    .ok_or_else(|| not_found(&id))?;

    tracing::info!(integration_id = %id, user_id = %user.user_id, "Integration updated");

    Ok(Json(updated))
}

/// DELETE /api/v1/integrations/{id}
pub async fn delete_integration(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    load_owned(&state, &id, &user).await?;

    if !IntegrationRepo::delete(&state.pool, &id).await? {
        return Err(not_found(&id));
    }

    tracing::info!(integration_id = %id, user_id = %user.user_id, "Integration deleted");
    Ok(StatusCode::NO_CONTENT)
}
