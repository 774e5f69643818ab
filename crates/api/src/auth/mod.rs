//! Session token verification.
//!
//! Sessions are issued by the external auth provider; this service only
//! verifies them.

pub mod jwt;
