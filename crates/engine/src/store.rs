//! Persistence interfaces used by the engine.
//!
//! [`ExecutionStore`] covers workflows, executions and their logs;
//! [`IntegrationStore`] covers the integration lookups made by the validator
//! and the credential fetcher. [`PgStore`] implements both on top of the
//! `wfb-db` repositories. [`MemoryStore`] keeps everything in process and can
//! be switched into an unavailable state to exercise failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use wfb_core::status::ExecutionStatus;
use wfb_core::types::{generate_id, EntityId};
use wfb_db::models::execution::{CreateExecution, Execution, UpdateExecution};
use wfb_db::models::execution_log::{CreateExecutionLog, ExecutionLog};
use wfb_db::models::integration::{CreateIntegration, Integration, IntegrationOwner};
use wfb_db::models::workflow::{CreateWorkflow, Workflow};
use wfb_db::repositories::{ExecutionLogRepo, ExecutionRepo, IntegrationRepo, WorkflowRepo};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Execution {0} not found")]
    ExecutionNotFound(EntityId),

    #[error("Execution {0} has already finished")]
    TerminalExecution(EntityId),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError>;

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>, StoreError>;

    /// Insert a `pending` execution.
    async fn create_execution(&self, input: &CreateExecution) -> Result<Execution, StoreError>;

    /// Patch an execution. Fails with [`StoreError::TerminalExecution`] once
    /// the execution is `completed` or `error`.
    async fn update_execution(
        &self,
        id: &str,
        patch: &UpdateExecution,
    ) -> Result<Execution, StoreError>;

    async fn append_execution_log(
        &self,
        input: &CreateExecutionLog,
    ) -> Result<ExecutionLog, StoreError>;

    /// Log rows in invocation order.
    async fn get_execution_logs(&self, execution_id: &str)
        -> Result<Vec<ExecutionLog>, StoreError>;

    /// Delete every execution of a workflow, returning how many were removed.
    async fn delete_executions(&self, workflow_id: &str) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait IntegrationStore: Send + Sync {
    async fn find_integration(&self, id: &str) -> Result<Option<Integration>, StoreError>;

    /// Owners of the given integrations; unknown ids are left out.
    async fn find_integration_owners(
        &self,
        ids: &[String],
    ) -> Result<Vec<IntegrationOwner>, StoreError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Store backed by the `wfb-db` repositories.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionStore for PgStore {
    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError> {
        Ok(WorkflowRepo::find_by_id(&self.pool, id).await?)
    }

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>, StoreError> {
        Ok(ExecutionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create_execution(&self, input: &CreateExecution) -> Result<Execution, StoreError> {
        Ok(ExecutionRepo::create(&self.pool, input).await?)
    }

    async fn update_execution(
        &self,
        id: &str,
        patch: &UpdateExecution,
    ) -> Result<Execution, StoreError> {
        if let Some(updated) = ExecutionRepo::update(&self.pool, id, patch).await? {
            return Ok(updated);
        }
        // The guarded update matched nothing: tell missing from finished.
        match ExecutionRepo::find_by_id(&self.pool, id).await? {
            Some(_) => Err(StoreError::TerminalExecution(id.to_string())),
            None => Err(StoreError::ExecutionNotFound(id.to_string())),
        }
    }

    async fn append_execution_log(
        &self,
        input: &CreateExecutionLog,
    ) -> Result<ExecutionLog, StoreError> {
        Ok(ExecutionLogRepo::append(&self.pool, input).await?)
    }

    async fn get_execution_logs(
        &self,
        execution_id: &str,
    ) -> Result<Vec<ExecutionLog>, StoreError> {
        Ok(ExecutionLogRepo::list_for_execution(&self.pool, execution_id).await?)
    }

    async fn delete_executions(&self, workflow_id: &str) -> Result<u64, StoreError> {
        Ok(ExecutionRepo::delete_for_workflow(&self.pool, workflow_id).await?)
    }
}

#[async_trait]
impl IntegrationStore for PgStore {
    async fn find_integration(&self, id: &str) -> Result<Option<Integration>, StoreError> {
        Ok(IntegrationRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_integration_owners(
        &self,
        ids: &[String],
    ) -> Result<Vec<IntegrationOwner>, StoreError> {
        Ok(IntegrationRepo::find_owners(&self.pool, ids).await?)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    workflows: HashMap<EntityId, Workflow>,
    integrations: HashMap<EntityId, Integration>,
    executions: HashMap<EntityId, Execution>,
    logs: Vec<ExecutionLog>,
}

/// Process-local store with the same semantics as [`PgStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every store call fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn insert_workflow(&self, input: CreateWorkflow) -> Workflow {
        let now = Utc::now();
        let workflow = Workflow {
            id: generate_id(),
            user_id: input.user_id,
            workspace_id: input.workspace_id,
            name: input.name,
            description: input.description,
            nodes: Json(input.nodes),
            edges: Json(input.edges),
            visibility: input.visibility.as_str().to_string(),
            trigger_type: input.trigger_type.as_str().to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.lock()
            .workflows
            .insert(workflow.id.clone(), workflow.clone());
        workflow
    }

    pub fn insert_integration(&self, input: CreateIntegration) -> Integration {
        let now = Utc::now();
        let integration = Integration {
            id: generate_id(),
            user_id: input.user_id,
            workspace_id: input.workspace_id,
            name: input.name,
            integration_type: input.integration_type.as_str().to_string(),
            config: input.config,
            credentials_encrypted: input.credentials_encrypted,
            created_at: now,
            updated_at: now,
        };
        self.lock()
            .integrations
            .insert(integration.id.clone(), integration.clone());
        integration
    }

    /// Number of executions currently held, across all workflows.
    pub fn execution_count(&self) -> usize {
        self.lock().executions.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError> {
        self.check_available()?;
        Ok(self.lock().workflows.get(id).cloned())
    }

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>, StoreError> {
        self.check_available()?;
        Ok(self.lock().executions.get(id).cloned())
    }

    async fn create_execution(&self, input: &CreateExecution) -> Result<Execution, StoreError> {
        self.check_available()?;
        let now = Utc::now();
        let execution = Execution {
            id: generate_id(),
            workflow_id: input.workflow_id.clone(),
            user_id: input.user_id.clone(),
            status: ExecutionStatus::Pending.as_str().to_string(),
            trigger_type: input.trigger_type.as_str().to_string(),
            input: input.input.clone(),
            output: None,
            error: None,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            created_at: now,
            updated_at: now,
        };
        self.lock()
            .executions
            .insert(execution.id.clone(), execution.clone());
        Ok(execution)
    }

    async fn update_execution(
        &self,
        id: &str,
        patch: &UpdateExecution,
    ) -> Result<Execution, StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let execution = state
            .executions
            .get_mut(id)
            .ok_or_else(|| StoreError::ExecutionNotFound(id.to_string()))?;
        if execution.is_terminal() {
            return Err(StoreError::TerminalExecution(id.to_string()));
        }

        if let Some(status) = patch.status {
            execution.status = status.as_str().to_string();
        }
        if let Some(output) = &patch.output {
            execution.output = Some(output.clone());
        }
        if let Some(error) = &patch.error {
            execution.error = Some(error.clone());
        }
        if patch.started_at.is_some() {
            execution.started_at = patch.started_at;
        }
        if patch.completed_at.is_some() {
            execution.completed_at = patch.completed_at;
        }
        if patch.duration_ms.is_some() {
            execution.duration_ms = patch.duration_ms;
        }
        execution.updated_at = Utc::now();
        Ok(execution.clone())
    }

    async fn append_execution_log(
        &self,
        input: &CreateExecutionLog,
    ) -> Result<ExecutionLog, StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let sequence = state
            .logs
            .iter()
            .filter(|l| l.execution_id == input.execution_id)
            .count();
        let log = ExecutionLog {
            id: generate_id(),
            execution_id: input.execution_id.clone(),
            sequence: sequence as i32,
            node_id: input.node_id.clone(),
            node_label: input.node_label.clone(),
            node_type: input.node_type.clone(),
            status: input.status.as_str().to_string(),
            input: input.input.clone(),
            output: input.output.clone(),
            error: input.error.clone(),
            started_at: input.started_at,
            completed_at: input.completed_at,
            duration_ms: input.duration_ms,
            created_at: Utc::now(),
        };
        state.logs.push(log.clone());
        Ok(log)
    }

    async fn get_execution_logs(
        &self,
        execution_id: &str,
    ) -> Result<Vec<ExecutionLog>, StoreError> {
        self.check_available()?;
        let mut logs: Vec<ExecutionLog> = self
            .lock()
            .logs
            .iter()
            .filter(|l| l.execution_id == execution_id)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.sequence);
        Ok(logs)
    }

    async fn delete_executions(&self, workflow_id: &str) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let before = state.executions.len();
        state.executions.retain(|_, e| e.workflow_id != workflow_id);
        let removed = before - state.executions.len();
        let MemoryState {
            executions, logs, ..
        } = &mut *state;
        logs.retain(|l| executions.contains_key(&l.execution_id));
        Ok(removed as u64)
    }
}

#[async_trait]
impl IntegrationStore for MemoryStore {
    async fn find_integration(&self, id: &str) -> Result<Option<Integration>, StoreError> {
        self.check_available()?;
        Ok(self.lock().integrations.get(id).cloned())
    }

    async fn find_integration_owners(
        &self,
        ids: &[String],
    ) -> Result<Vec<IntegrationOwner>, StoreError> {
        self.check_available()?;
        let state = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.integrations.get(id))
            .map(|i| IntegrationOwner {
                id: i.id.clone(),
                user_id: i.user_id.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use wfb_core::status::NodeStatus;
    use wfb_core::workflow::TriggerType;

    use super::*;

    fn new_execution(workflow_id: &str) -> CreateExecution {
        CreateExecution {
            workflow_id: workflow_id.to_string(),
            user_id: "user-a".to_string(),
            trigger_type: TriggerType::Manual,
            input: Some(json!({})),
        }
    }

    fn log_for(execution_id: &str, node_id: &str) -> CreateExecutionLog {
        CreateExecutionLog {
            execution_id: execution_id.to_string(),
            node_id: node_id.to_string(),
            node_label: node_id.to_string(),
            node_type: "action".to_string(),
            status: NodeStatus::Success,
            input: None,
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        }
    }

    #[tokio::test]
    async fn terminal_execution_refuses_updates() {
        let store = MemoryStore::new();
        let exec = store.create_execution(&new_execution("wf")).await.unwrap();
        let done = UpdateExecution {
            status: Some(ExecutionStatus::Completed),
            ..Default::default()
        };
        store.update_execution(&exec.id, &done).await.unwrap();

        let err = store.update_execution(&exec.id, &done).await.unwrap_err();
        assert_matches!(err, StoreError::TerminalExecution(id) if id == exec.id);

        let err = store.update_execution("missing", &done).await.unwrap_err();
        assert_matches!(err, StoreError::ExecutionNotFound(_));
    }

    #[tokio::test]
    async fn logs_are_sequenced_per_execution() {
        let store = MemoryStore::new();
        let a = store.create_execution(&new_execution("wf")).await.unwrap();
        let b = store.create_execution(&new_execution("wf")).await.unwrap();

        store.append_execution_log(&log_for(&a.id, "n1")).await.unwrap();
        store.append_execution_log(&log_for(&b.id, "n1")).await.unwrap();
        let second = store.append_execution_log(&log_for(&a.id, "n2")).await.unwrap();
        assert_eq!(second.sequence, 1);

        let logs = store.get_execution_logs(&a.id).await.unwrap();
        let ids: Vec<&str> = logs.iter().map(|l| l.node_id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2"]);
    }

    #[tokio::test]
    async fn delete_executions_drops_logs() {
        let store = MemoryStore::new();
        let a = store.create_execution(&new_execution("wf-1")).await.unwrap();
        store.create_execution(&new_execution("wf-2")).await.unwrap();
        store.append_execution_log(&log_for(&a.id, "n1")).await.unwrap();

        assert_eq!(store.delete_executions("wf-1").await.unwrap(), 1);
        assert_eq!(store.execution_count(), 1);
        assert!(store.get_execution_logs(&a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.create_execution(&new_execution("wf")).await.unwrap_err();
        assert_matches!(err, StoreError::Unavailable(_));

        store.set_unavailable(false);
        assert!(store.create_execution(&new_execution("wf")).await.is_ok());
    }
}
