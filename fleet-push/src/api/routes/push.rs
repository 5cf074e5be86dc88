//! Push routes: trigger, VAPID key discovery and subscription management.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::middleware::require_bearer;
use crate::api::models::{
    SubscribeRequest, SubscriptionResponse, TriggerResponse, UnsubscribeRequest,
    VapidPublicKeyResponse,
};
use crate::api::server::AppState;
use crate::domain::{NotificationOverrides, Subscription};

/// Create the push router. Only the trigger requires the bearer secret.
pub fn router(state: &AppState) -> Router<AppState> {
    let trigger = Router::new()
        .route("/notify", post(trigger_notification))
        .route_layer(middleware::from_fn_with_state(
            state.trigger_auth.clone(),
            require_bearer,
        ));

    Router::new()
        .merge(trigger)
        .route("/vapid-public-key", get(vapid_public_key))
        .route("/subscriptions", post(subscribe).delete(unsubscribe))
}

/// Run one fan-out to every subscription.
///
/// The body is optional; when present it overrides fields of the configured
/// notification.
async fn trigger_notification(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<TriggerResponse>> {
    let overrides = parse_overrides(&body)?;
    let notification = state.notification.merged(overrides);

    let report = state.coordinator.run(&notification).await?;
    Ok(Json(TriggerResponse::from(report)))
}

fn parse_overrides(body: &[u8]) -> ApiResult<NotificationOverrides> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(NotificationOverrides::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid notification body: {}", e)))
}

async fn vapid_public_key(State(state): State<AppState>) -> Json<VapidPublicKeyResponse> {
    Json(VapidPublicKeyResponse {
        public_key: state.coordinator.vapid_public_key().to_string(),
    })
}

async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<SubscriptionResponse>)> {
    let endpoint = request.endpoint.trim();
    webpush::push_service_audience(endpoint)
        .map_err(|e| ApiError::validation(format!("Invalid endpoint: {}", e)))?;

    let mut subscription = Subscription::new(endpoint, request.keys.p256dh, request.keys.auth);
    if let Some(user_agent) = request.user_agent.filter(|ua| !ua.trim().is_empty()) {
        subscription = subscription.with_user_agent(user_agent);
    }
    subscription
        .keys()
        .map_err(|e| ApiError::validation(format!("Invalid subscription keys: {}", e)))?;

    let stored = state.store.upsert(&subscription).await?;
    info!(endpoint = %stored.endpoint, "Push subscription registered");

    Ok((StatusCode::CREATED, Json(SubscriptionResponse::from(stored))))
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> ApiResult<StatusCode> {
    if state.store.remove(request.endpoint.trim()).await? {
        info!(endpoint = %request.endpoint, "Push subscription removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Subscription not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_means_no_overrides() {
        let overrides = parse_overrides(b"").unwrap();
        assert!(overrides.title.is_none());
        let overrides = parse_overrides(b"  \n").unwrap();
        assert!(overrides.body.is_none());
    }

    #[test]
    fn test_override_body_parsed() {
        let overrides = parse_overrides(br#"{"title":"Low balance"}"#).unwrap();
        assert_eq!(overrides.title.as_deref(), Some("Low balance"));
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let err = parse_overrides(b"{not json").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
