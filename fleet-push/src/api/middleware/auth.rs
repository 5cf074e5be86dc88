//! Bearer-token guard for the push trigger.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::api::error::ApiError;

/// Shared secret expected as `Authorization: Bearer <secret>`.
#[derive(Clone)]
pub struct BearerAuth {
    secret: Arc<str>,
}

impl BearerAuth {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Check an `Authorization` header value. Comparison is constant-time in
    /// the token contents.
    pub fn is_authorized(&self, header: Option<&str>) -> bool {
        if self.secret.is_empty() {
            return false;
        }
        match header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token.as_bytes().ct_eq(self.secret.as_bytes()).into(),
            None => false,
        }
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth").finish_non_exhaustive()
    }
}

/// Middleware rejecting requests without the trigger secret.
///
/// Rejection happens before the handler runs, so an unauthorized call has no
/// side effects.
pub async fn require_bearer(
    State(auth): State<BearerAuth>,
    request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if !auth.is_authorized(header) {
        if header.is_some() {
            tracing::warn!("Invalid bearer token on push trigger");
        } else {
            tracing::warn!("Missing bearer token on push trigger");
        }
        return ApiError::unauthorized("Missing or invalid bearer token").into_response();
    }

    next.run(request).await
}
