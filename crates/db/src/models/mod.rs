//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for patches
//!
//! Entities serialize in camelCase, the shape the builder UI consumes.

pub mod api_key;
pub mod execution;
pub mod execution_log;
pub mod integration;
pub mod workflow;
