//! API middleware.

pub mod auth;

pub use auth::{BearerAuth, require_bearer};
