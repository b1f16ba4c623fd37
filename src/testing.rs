//! Shared fixtures for in-crate tests.

use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;

use crate::load_generator::request::RequestExecutor;
use crate::metrics::{DurationSummary, StatsCollector};

/// Bind `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Stand-in for the service under test.
pub async fn spawn_target() -> String {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/devices", get(|| async { r#"[{"id":1}]"# }))
        .route("/api/images", get(|| async { "[]" }))
        .route("/fail", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    serve(app).await
}

/// Target whose every endpoint accepts the request and never answers.
pub async fn spawn_hanging_target() -> String {
    async fn hang() -> &'static str {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        "late"
    }
    let app = Router::new()
        .route("/health", get(hang))
        .route("/api/devices", get(hang))
        .route("/api/images", get(hang));
    serve(app).await
}

/// A URL on a port nothing listens on.
pub fn unreachable_url() -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    format!("http://127.0.0.1:{port}/health")
}

pub fn executor_for_tests() -> Arc<RequestExecutor> {
    Arc::new(RequestExecutor::new(
        reqwest::Client::new(),
        Arc::new(StatsCollector::new()),
        Arc::new(DurationSummary::new()),
        Duration::ZERO,
    ))
}
