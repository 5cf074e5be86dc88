//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::Error;

/// An HTTP failure: status plus a stable machine-readable `code`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn with_status(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400, the request body could not be parsed.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// 422, for well-formed requests carrying unusable values.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "code": self.code, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Internal details are logged here and never reach the caller.
impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => Self::validation(msg),
            Error::WebPush(e) => Self::validation(e.to_string()),
            Error::DatabaseSqlx(_) | Error::Migration(_) => {
                tracing::error!(error = %err, "Storage failure while handling request");
                Self::internal("Storage unavailable")
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                Self::internal("Internal server error")
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_constructors() {
        let err = ApiError::unauthorized("no token");
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, "UNAUTHORIZED");
        assert_eq!(err.message, "no token");

        assert_eq!(
            ApiError::validation("bad key").status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_from_domain_error() {
        let api_err: ApiError = Error::validation("endpoint must be https").into();
        assert_eq!(api_err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let api_err: ApiError =
            Error::WebPush(webpush::WebPushError::InvalidSubscriberKey("p256dh".into())).into();
        assert_eq!(api_err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let api_err: ApiError = Error::DatabaseSqlx(sqlx::Error::RowNotFound).into();
        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api_err.message.contains("RowNotFound"));
    }

    #[tokio::test]
    async fn test_response_body() {
        let response = ApiError::not_found("Subscription not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({"code": "NOT_FOUND", "message": "Subscription not found"})
        );
    }
}
