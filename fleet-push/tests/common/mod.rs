//! Shared fixtures: subscriber key material and a local push service.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use fleet_push::database::{DbPool, migrate, open_pool_with};
use fleet_push::domain::Subscription;
use tokio::net::TcpListener;
use webpush::{AgreementPrivateKey, base64url_encode, generate_ephemeral_agreement_key_pair};

/// In-memory SQLite with migrations applied. One connection, since each
/// connection to `sqlite::memory:` sees its own database.
pub async fn setup_test_db() -> DbPool {
    let pool = open_pool_with("sqlite::memory:", 1)
        .await
        .expect("Failed to create test pool");

    migrate(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// A browser-side subscription: the stored row plus the private half only
/// the browser would hold.
pub struct TestSubscriber {
    pub subscription: Subscription,
    pub private_key: AgreementPrivateKey,
    pub auth: [u8; 16],
}

impl TestSubscriber {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let (private_key, public_key) = generate_ephemeral_agreement_key_pair();
        let auth: [u8; 16] = rand_auth();
        let subscription = Subscription::new(
            endpoint,
            base64url_encode(public_key.as_bytes()),
            base64url_encode(auth),
        );
        Self {
            subscription,
            private_key,
            auth,
        }
    }
}

fn rand_auth() -> [u8; 16] {
    // X coordinate bytes of a fresh key.
    let (_, public_key) = generate_ephemeral_agreement_key_pair();
    let mut auth = [0u8; 16];
    auth.copy_from_slice(&public_key.as_bytes()[1..17]);
    auth
}

/// One request as seen by the push service.
#[derive(Debug, Clone)]
pub struct ReceivedPush {
    pub id: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone, Default)]
struct MockState {
    statuses: Arc<HashMap<String, u16>>,
    received: Arc<Mutex<Vec<ReceivedPush>>>,
}

/// Push service on a random local port. `POST /push/{id}` answers with the
/// status configured for `id`, 201 otherwise.
pub struct MockPushService {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedPush>>>,
}

impl MockPushService {
    pub async fn start(statuses: &[(&str, u16)]) -> Self {
        let state = MockState {
            statuses: Arc::new(
                statuses
                    .iter()
                    .map(|(id, status)| (id.to_string(), *status))
                    .collect(),
            ),
            received: Arc::default(),
        };
        let received = state.received.clone();

        let app = Router::new()
            .route("/push/{id}", post(receive))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, received }
    }

    pub fn endpoint(&self, id: &str) -> String {
        format!("http://{}/push/{}", self.addr, id)
    }

    pub fn received(&self) -> Vec<ReceivedPush> {
        self.received.lock().unwrap().clone()
    }
}

async fn receive(
    State(state): State<MockState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let status = state.statuses.get(&id).copied().unwrap_or(201);
    state.received.lock().unwrap().push(ReceivedPush {
        id,
        headers,
        body,
    });

    let status = StatusCode::from_u16(status).unwrap();
    let body = if status == StatusCode::GONE {
        "push subscription has unsubscribed or expired"
    } else {
        ""
    };
    (status, body)
}
