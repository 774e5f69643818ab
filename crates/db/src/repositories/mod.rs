//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod api_key_repo;
pub mod execution_log_repo;
pub mod execution_repo;
pub mod integration_repo;
pub mod workflow_repo;

pub use api_key_repo::ApiKeyRepo;
pub use execution_log_repo::ExecutionLogRepo;
pub use execution_repo::ExecutionRepo;
pub use integration_repo::IntegrationRepo;
pub use workflow_repo::WorkflowRepo;
