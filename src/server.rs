use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Result, TesterError};
use crate::metrics::DurationSummary;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Router exposing the duration summary at `/metrics`.
pub fn create_router(durations: Arc<DurationSummary>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(durations)
        .layer(TraceLayer::new_for_http())
}

async fn metrics(State(durations): State<Arc<DurationSummary>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], durations.render())
}

/// Bind up front so a taken port fails startup instead of a background task.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TesterError::Bind { addr, source })?;
    info!(%addr, "client metrics server listening");
    Ok(listener)
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    axum::serve(listener, router).await.map_err(TesterError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn metrics_endpoint_serves_exposition_text() {
        let durations = Arc::new(DurationSummary::new());
        durations.record("http://t/health", "200", Duration::from_millis(12));

        let base = crate::testing::serve(create_router(durations)).await;
        let res = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert!(res.status().is_success());
        assert!(res.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let body = res.text().await.unwrap();
        assert!(body.contains(
            "tester_request_duration_seconds_count{path=\"http://t/health\",status=\"200\"} 1"
        ));
    }

    #[tokio::test]
    async fn bind_reports_a_taken_port() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let err = bind(addr).await.unwrap_err();
        assert!(matches!(err, TesterError::Bind { .. }));
    }
}
