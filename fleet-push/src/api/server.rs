//! HTTP server: shared state, middleware stack and lifecycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::CorsLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, MakeSpan, OnFailure,
    OnRequest, OnResponse, TraceLayer,
};
use tracing::{Level, Span, info};

use crate::Result;
use crate::api::middleware::BearerAuth;
use crate::api::routes;
use crate::config::ServerConfig;
use crate::database::SubscriptionStore;
use crate::delivery::DeliveryCoordinator;
use crate::domain::Notification;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Used for the uptime reported by `/health`
    pub start_time: Instant,
    pub coordinator: Arc<DeliveryCoordinator>,
    pub store: Arc<dyn SubscriptionStore>,
    /// Notification sent when a trigger carries no overrides
    pub notification: Arc<Notification>,
    pub trigger_auth: BearerAuth,
}

impl AppState {
    pub fn new(
        coordinator: Arc<DeliveryCoordinator>,
        store: Arc<dyn SubscriptionStore>,
        notification: Notification,
        trigger_auth: BearerAuth,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            coordinator,
            store,
            notification: Arc::new(notification),
            trigger_auth,
        }
    }
}

/// Health probes are polled constantly and stay out of the request log.
fn is_health_probe(req: &Request) -> bool {
    req.uri().path().starts_with("/health")
}

pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
    shutdown: CancellationToken,
}

impl ApiServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token drains in-flight requests and stops the server.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Routes plus body limit, CORS and request tracing.
    pub fn build_router(&self) -> Router {
        let mut router = routes::create_router(self.state.clone())
            .layer(DefaultBodyLimit::max(self.config.body_limit));

        if self.config.permissive_cors {
            router = router.layer(CorsLayer::permissive());
        }

        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    if is_health_probe(req) {
                        Span::none()
                    } else {
                        DefaultMakeSpan::new().level(Level::INFO).make_span(req)
                    }
                })
                .on_request(|req: &Request, span: &Span| {
                    if !span.is_disabled() {
                        DefaultOnRequest::new().level(Level::INFO).on_request(req, span);
                    }
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if !span.is_disabled() {
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .on_response(res, latency, span);
                        }
                    },
                )
                .on_failure(
                    |class: ServerErrorsFailureClass, latency: Duration, span: &Span| {
                        if !span.is_disabled() {
                            DefaultOnFailure::new()
                                .level(Level::ERROR)
                                .on_failure(class, latency, span);
                        }
                    },
                ),
        )
    }

    /// Serve until the shutdown token is cancelled.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "API server listening");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("API server draining connections");
            })
            .await?;

        Ok(())
    }
}
