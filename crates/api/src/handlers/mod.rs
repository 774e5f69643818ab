pub mod api_keys;
pub mod executions;
pub mod integrations;
pub mod webhook;
pub mod workflows;
