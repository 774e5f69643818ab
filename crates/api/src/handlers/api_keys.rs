//! Handlers for webhook API key management.
//!
//! The plaintext key is returned **only** on creation; listings expose only
//! the `keyPrefix` for identification.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use wfb_core::api_keys::generate_api_key;
use wfb_core::error::CoreError;
use wfb_db::models::api_key::ApiKeyCreatedResponse;
use wfb_db::repositories::ApiKeyRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(length(max = 255))]
    pub name: Option<String>,
}

/// POST /api/v1/api-keys
///
/// Generate a new key for the caller. The plaintext key is returned exactly
/// once.
pub async fn create_api_key(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateApiKeyRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let generated = generate_api_key();
    let key = ApiKeyRepo::create(
        &state.pool,
        &user.user_id,
        name,
        &generated.hash,
        &generated.prefix,
    )
    .await?;

    tracing::info!(
        api_key_id = %key.id,
        key_prefix = %generated.prefix,
        user_id = %user.user_id,
        "API key created",
    );

    let response = ApiKeyCreatedResponse {
        id: key.id,
        name: key.name,
        key_prefix: generated.prefix,
        key: generated.plaintext,
        created_at: key.created_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/api-keys
pub async fn list_api_keys(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let keys = ApiKeyRepo::list_for_user(&state.pool, &user.user_id).await?;
    Ok(Json(keys))
}

/// DELETE /api/v1/api-keys/{id}
pub async fn delete_api_key(
    user: AuthUser,
    State(state): State<AppState>,
    Path(key_id): Path<String>,
) -> AppResult<StatusCode> {
    if !ApiKeyRepo::delete(&state.pool, &key_id, &user.user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ApiKey",
            id: key_id,
        }));
    }

    tracing::info!(api_key_id = %key_id, user_id = %user.user_id, "API key revoked");
    Ok(StatusCode::NO_CONTENT)
}
