//! Domain logic for the workflow builder.
//!
//! This crate has no internal dependencies: it holds the workflow graph
//! model, execution planning, template and condition evaluation, and the
//! key/credential material shared by the persistence, engine and HTTP
//! layers.

pub mod api_keys;
pub mod condition;
pub mod crypto;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod integrations;
pub mod status;
pub mod template;
pub mod types;
pub mod workflow;
