//! Workflow execution engine.
//!
//! The [`Orchestrator`] walks a workflow graph from its trigger, resolving
//! each action node through the [`StepRegistry`], fetching the node's
//! credentials with the [`CredentialFetcher`] and invoking the step through
//! [`executor::execute`]. Every invocation is recorded through an
//! [`ExecutionStore`]. The [`WorkflowValidator`] checks integration
//! references before a workflow is saved or run.

pub mod credentials;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod registry;
pub mod steps;
pub mod store;
pub mod validator;

pub use credentials::{CredentialBag, CredentialError, CredentialFetcher};
pub use error::EngineError;
pub use executor::StepResult;
pub use orchestrator::{ExecutionOutcome, Orchestrator, PreparedRun};
pub use registry::{ActionType, StepEntry, StepRegistry};
pub use store::{ExecutionStore, IntegrationStore, MemoryStore, PgStore, StoreError};
pub use validator::{ValidationResult, WorkflowValidator};
