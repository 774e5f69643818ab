//! API-key authentication for webhook triggers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use wfb_core::api_keys::{hash_api_key, looks_like_api_key};
use wfb_core::error::CoreError;
use wfb_db::repositories::ApiKeyRepo;

use crate::error::AppError;
use crate::state::AppState;

/// Caller authenticated by an `Authorization: Bearer wfb_...` API key.
///
/// Successful lookups stamp the key's `last_used_at`.
#[derive(Debug, Clone)]
pub struct ApiKeyUser {
    pub key_id: String,
    /// The user the key acts for.
    pub user_id: String,
}

impl FromRequestParts<AppState> for ApiKeyUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = |msg: &str| AppError::Core(CoreError::Unauthorized(msg.into()));

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let key = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|k| looks_like_api_key(k))
            .ok_or_else(|| unauthorized("Invalid API key format"))?;

        let owner = ApiKeyRepo::validate(&state.pool, &hash_api_key(key))
            .await?
            .ok_or_else(|| unauthorized("Invalid API key"))?;

        Ok(ApiKeyUser {
            key_id: owner.id,
            user_id: owner.user_id,
        })
    }
}
