use wfb_core::graph::GraphError;
use wfb_core::types::EntityId;

use crate::store::StoreError;

/// Errors that stop a run before or outside node execution.
///
/// A failing node is not an error here: it ends the run with an `error`
/// execution status and is reported through [`ExecutionOutcome`](crate::ExecutionOutcome).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid workflow graph: {0}")]
    InvalidGraph(#[from] GraphError),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(EntityId),

    #[error(transparent)]
    Store(#[from] StoreError),
}
