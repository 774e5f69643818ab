//! Integration reference checks for workflows.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use wfb_core::workflow::{extract_integration_ids, Node};

use crate::store::{IntegrationStore, StoreError};

/// Outcome of [`WorkflowValidator::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    /// Every rejected id, in the order the nodes reference them.
    pub invalid_ids: Vec<String>,
    /// Ids with no integration behind them.
    #[serde(skip)]
    pub missing_ids: Vec<String>,
    /// Ids owned by someone other than the workflow owner.
    #[serde(skip)]
    pub foreign_ids: Vec<String>,
}

impl ValidationResult {
    pub fn has_foreign(&self) -> bool {
        !self.foreign_ids.is_empty()
    }
}

#[derive(Clone)]
pub struct WorkflowValidator {
    store: Arc<dyn IntegrationStore>,
}

impl WorkflowValidator {
    pub fn new(store: Arc<dyn IntegrationStore>) -> Self {
        Self { store }
    }

    /// Check every `integrationId` in `nodes` exists and belongs to
    /// `owner_user_id`. All ids are looked up in a single query.
    pub async fn validate(
        &self,
        nodes: &[Node],
        owner_user_id: &str,
    ) -> Result<ValidationResult, StoreError> {
        let ids = extract_integration_ids(nodes);
        if ids.is_empty() {
            return Ok(ValidationResult {
                valid: true,
                ..Default::default()
            });
        }

        let owners: HashMap<String, String> = self
            .store
            .find_integration_owners(&ids)
            .await?
            .into_iter()
            .map(|o| (o.id, o.user_id))
            .collect();

        let mut result = ValidationResult::default();
        for id in ids {
            match owners.get(&id) {
                None => result.missing_ids.push(id.clone()),
                Some(owner) if owner != owner_user_id => result.foreign_ids.push(id.clone()),
                Some(_) => continue,
            }
            result.invalid_ids.push(id);
        }
        result.valid = result.invalid_ids.is_empty();

        if !result.valid {
            tracing::debug!(
                owner = owner_user_id,
                invalid = ?result.invalid_ids,
                "Workflow references invalid integrations"
            );
        }
        Ok(result)
    }
}

impl std::fmt::Debug for WorkflowValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use wfb_core::integrations::IntegrationType;
    use wfb_db::models::integration::CreateIntegration;

    use super::*;
    use crate::store::MemoryStore;

    fn node_using(id: &str, integration_id: &str) -> Node {
        serde_json::from_value(json!({
            "id": id,
            "type": "action",
            "data": { "label": id, "type": "action", "config": { "integrationId": integration_id } }
        }))
        .unwrap()
    }

    fn add_integration(store: &MemoryStore, owner: &str) -> String {
        store
            .insert_integration(CreateIntegration {
                user_id: owner.into(),
                workspace_id: None,
                name: "i".into(),
                integration_type: IntegrationType::Resend,
                config: json!({}),
                credentials_encrypted: String::new(),
            })
            .id
    }

    #[tokio::test]
    async fn nodes_without_integrations_are_valid() {
        let validator = WorkflowValidator::new(Arc::new(MemoryStore::new()));
        let result = validator.validate(&[], "user-a").await.unwrap();
        assert!(result.valid);
        assert!(result.invalid_ids.is_empty());
    }

    #[tokio::test]
    async fn foreign_and_missing_ids_are_separated() {
        let store = Arc::new(MemoryStore::new());
        let mine = add_integration(&store, "user-a");
        let theirs = add_integration(&store, "user-b");
        let validator = WorkflowValidator::new(store);

        let nodes = vec![
            node_using("n1", &mine),
            node_using("n2", &theirs),
            node_using("n3", "ghost"),
            node_using("n4", &theirs),
        ];
        let result = validator.validate(&nodes, "user-a").await.unwrap();

        assert!(!result.valid);
        assert_eq!(result.invalid_ids, vec![theirs.clone(), "ghost".to_string()]);
        assert_eq!(result.foreign_ids, vec![theirs]);
        assert_eq!(result.missing_ids, vec!["ghost".to_string()]);
        assert!(result.has_foreign());
    }

    #[tokio::test]
    async fn owned_integrations_pass() {
        let store = Arc::new(MemoryStore::new());
        let mine = add_integration(&store, "user-a");
        let validator = WorkflowValidator::new(store);

        let result = validator
            .validate(&[node_using("n1", &mine)], "user-a")
            .await
            .unwrap();
        assert!(result.valid);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let validator = WorkflowValidator::new(store);

        let err = validator
            .validate(&[node_using("n1", "x")], "user-a")
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Unavailable(_));
    }
}
