//! HTTP API tests: trigger authorization and subscription management.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use fleet_push::api::{ApiServer, AppState, BearerAuth};
use fleet_push::config::ServerConfig;
use fleet_push::database::{DbPool, SqlxNotificationLog, SqlxSubscriptionStore, SubscriptionStore};
use fleet_push::delivery::DeliveryCoordinator;
use fleet_push::domain::Notification;
use fleet_push::http_client::build_push_client;
use tower::ServiceExt;
use webpush::{VapidAuthenticator, VapidKeyPair};

use common::{MockPushService, TestSubscriber, setup_test_db};

const SECRET: &str = "trigger-secret";

struct TestApp {
    router: Router,
    pool: DbPool,
    store: Arc<dyn SubscriptionStore>,
    keys: VapidKeyPair,
}

async fn test_app() -> TestApp {
    let pool = setup_test_db().await;
    let store: Arc<dyn SubscriptionStore> = Arc::new(SqlxSubscriptionStore::new(pool.clone()));
    let log = Arc::new(SqlxNotificationLog::new(pool.clone()));
    let keys = VapidKeyPair::generate();
    let coordinator = DeliveryCoordinator::new(
        store.clone(),
        log,
        VapidAuthenticator::new(&keys, "mailto:ops@example.com"),
        build_push_client(Duration::from_secs(5)).unwrap(),
    );

    let state = AppState::new(
        Arc::new(coordinator),
        store.clone(),
        Notification::default(),
        BearerAuth::new(SECRET),
    );
    let router = ApiServer::new(ServerConfig::default(), state).build_router();

    TestApp {
        router,
        pool,
        store,
        keys,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn trigger(authorization: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/push/notify")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn log_row_count(pool: &DbPool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM push_notifications_log")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

#[tokio::test]
async fn test_trigger_without_token_has_no_side_effects() {
    let push = MockPushService::start(&[("gone", 410)]).await;
    let app = test_app().await;
    for id in ["alice", "gone"] {
        app.store
            .upsert(&TestSubscriber::new(push.endpoint(id)).subscription)
            .await
            .unwrap();
    }

    let (status, body) = send(&app.router, trigger(None, "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app.router, trigger(Some("Bearer wrong-secret"), "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(push.received().is_empty());
    assert_eq!(app.store.list_all().await.unwrap().len(), 2);
    assert_eq!(log_row_count(&app.pool).await, 0);
}

#[tokio::test]
async fn test_authorized_trigger_reports_and_prunes() {
    let push = MockPushService::start(&[("gone", 410)]).await;
    let app = test_app().await;
    for id in ["alice", "bob", "gone"] {
        app.store
            .upsert(&TestSubscriber::new(push.endpoint(id)).subscription)
            .await
            .unwrap();
    }

    let auth = format!("Bearer {}", SECRET);
    let (status, body) = send(&app.router, trigger(Some(&auth), "")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["sent"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["expired"], 1);
    assert_eq!(body["details"].as_array().unwrap().len(), 3);

    let gone = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["endpoint"] == push.endpoint("gone"))
        .unwrap();
    assert_eq!(gone["status"], "invalidated");
    assert_eq!(gone["http_status"], 410);

    let remaining = app.store.list_all().await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|s| s.last_used_at.is_some()));
    assert_eq!(log_row_count(&app.pool).await, 1);
}

#[tokio::test]
async fn test_trigger_body_overrides_notification() {
    let push = MockPushService::start(&[]).await;
    let app = test_app().await;
    let subscriber = TestSubscriber::new(push.endpoint("reader"));
    app.store.upsert(&subscriber.subscription).await.unwrap();

    let auth = format!("Bearer {}", SECRET);
    let (status, _) = send(
        &app.router,
        trigger(Some(&auth), r#"{"body":"Saldo baixo"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let received = push.received();
    let plaintext =
        webpush::decrypt(&received[0].body, subscriber.private_key, &subscriber.auth).unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&plaintext).unwrap();
    assert_eq!(payload["body"], "Saldo baixo");
    assert_eq!(payload["title"], Notification::default().title);
}

#[tokio::test]
async fn test_trigger_rejects_malformed_body() {
    let app = test_app().await;
    let auth = format!("Bearer {}", SECRET);

    let (status, body) = send(&app.router, trigger(Some(&auth), "{oops")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(log_row_count(&app.pool).await, 0);
}

#[tokio::test]
async fn test_trigger_rejects_oversized_notification() {
    let push = MockPushService::start(&[]).await;
    let app = test_app().await;
    for id in ["alice", "bob"] {
        app.store
            .upsert(&TestSubscriber::new(push.endpoint(id)).subscription)
            .await
            .unwrap();
    }

    let auth = format!("Bearer {}", SECRET);
    let overrides = serde_json::json!({ "body": "x".repeat(5000) }).to_string();
    let (status, body) = send(&app.router, trigger(Some(&auth), &overrides)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(push.received().is_empty());
    assert_eq!(app.store.list_all().await.unwrap().len(), 2);
    assert_eq!(log_row_count(&app.pool).await, 0);
}

#[tokio::test]
async fn test_vapid_public_key() {
    let app = test_app().await;

    let request = Request::builder()
        .uri("/api/push/vapid-public-key")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["public_key"], app.keys.public_key_base64url());
}

#[tokio::test]
async fn test_subscribe_and_unsubscribe() {
    let app = test_app().await;
    let subscriber = TestSubscriber::new("https://fcm.googleapis.com/fcm/send/abc");
    let sub = &subscriber.subscription;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/push/subscriptions",
            serde_json::json!({
                "endpoint": sub.endpoint,
                "keys": { "p256dh": sub.p256dh, "auth": sub.auth },
                "user_agent": "Mozilla/5.0"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["endpoint"], sub.endpoint);
    assert_eq!(app.store.list_all().await.unwrap().len(), 1);

    let unsubscribe = || {
        json_request(
            "DELETE",
            "/api/push/subscriptions",
            serde_json::json!({ "endpoint": sub.endpoint }),
        )
    };
    let (status, _) = send(&app.router, unsubscribe()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.store.list_all().await.unwrap().is_empty());

    let (status, body) = send(&app.router, unsubscribe()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_subscribe_rejects_invalid_keys_and_endpoint() {
    let app = test_app().await;
    let valid = TestSubscriber::new("https://push.example.com/x").subscription;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/push/subscriptions",
            serde_json::json!({
                "endpoint": valid.endpoint,
                "keys": { "p256dh": "bm90LWEta2V5", "auth": valid.auth }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            "/api/push/subscriptions",
            serde_json::json!({
                "endpoint": "ftp://push.example.com/x",
                "keys": { "p256dh": valid.p256dh, "auth": valid.auth }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert!(app.store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app().await;

    for uri in ["/health", "/health/live"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
    }
}
