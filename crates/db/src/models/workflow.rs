//! Workflow entity and DTOs.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use wfb_core::types::{EntityId, Timestamp};
use wfb_core::workflow::{Edge, Node, TriggerType, Visibility};

/// A row from the `workflows` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: EntityId,
    pub user_id: String,
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    pub nodes: Json<Vec<Node>>,
    pub edges: Json<Vec<Edge>>,
    pub visibility: String,
    pub trigger_type: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Workflow {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::parse(&self.visibility).unwrap_or_default()
    }
}

/// DTO for inserting a workflow. The id is generated by the repository.
#[derive(Debug, Clone)]
pub struct CreateWorkflow {
    pub user_id: String,
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub visibility: Visibility,
    pub trigger_type: TriggerType,
}

/// DTO for patching a workflow. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateWorkflow {
    pub name: Option<String>,
    pub description: Option<String>,
    pub nodes: Option<Vec<Node>>,
    pub edges: Option<Vec<Edge>>,
    pub visibility: Option<Visibility>,
    pub trigger_type: Option<TriggerType>,
    pub is_active: Option<bool>,
}
