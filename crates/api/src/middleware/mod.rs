//! Authentication extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the signed-in user from a session JWT.
//!   `Option<AuthUser>` accepts anonymous requests.
//! - [`api_key::ApiKeyUser`] -- Authenticates a webhook call by API key.

pub mod api_key;
pub mod auth;
