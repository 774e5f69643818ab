//! Webhook API key models.

use serde::Serialize;
use sqlx::FromRow;
use wfb_core::types::{EntityId, Timestamp};

/// A row from the `api_keys` table.
///
/// **Note:** `key_hash` is never serialized to responses. The `key_prefix`
/// field is used for human-readable identification.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: EntityId,
    pub user_id: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub key_prefix: String,
    pub created_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
}

/// Result of a successful key lookup: the key and the user it acts for.
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyOwner {
    pub id: EntityId,
    pub user_id: String,
}

/// Response returned when a new API key is created.
/// Includes the plaintext key (shown exactly once).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyCreatedResponse {
    pub id: EntityId,
    pub name: Option<String>,
    pub key_prefix: String,
    /// The full plaintext key. Shown **once** and never stored.
    pub key: String,
    pub created_at: Timestamp,
}
