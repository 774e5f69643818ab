//! Integration entity and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use wfb_core::integrations::IntegrationType;
use wfb_core::types::{EntityId, Timestamp};

/// A row from the `integrations` table.
///
/// **Note:** `credentials_encrypted` is never serialized to responses.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: EntityId,
    pub user_id: String,
    pub workspace_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    pub config: serde_json::Value,
    #[serde(skip_serializing)]
    pub credentials_encrypted: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Integration {
    pub fn kind(&self) -> Option<IntegrationType> {
        IntegrationType::parse(&self.integration_type)
    }
}

/// Id and owner of an integration, for batch ownership checks.
#[derive(Debug, Clone, FromRow)]
pub struct IntegrationOwner {
    pub id: EntityId,
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct CreateIntegration {
    pub user_id: String,
    pub workspace_id: Option<String>,
    pub name: String,
    pub integration_type: IntegrationType,
    pub config: serde_json::Value,
    pub credentials_encrypted: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateIntegration {
    pub name: Option<String>,
    pub config: Option<serde_json::Value>,
    pub credentials_encrypted: Option<String>,
}
