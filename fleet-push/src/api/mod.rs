//! HTTP API: push trigger, subscription management and health probes.

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use middleware::BearerAuth;
pub use server::{ApiServer, AppState};
