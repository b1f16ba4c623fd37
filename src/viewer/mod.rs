pub mod parser;
pub mod report;

use tracing::debug;

use crate::error::{Result, TesterError};

/// Reads a running load test's statistics from another process.
pub struct StatsViewer {
    client: reqwest::Client,
    base_url: String,
    metrics_url: String,
}

impl StatsViewer {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, metrics_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            metrics_url: metrics_url.into(),
        }
    }

    /// Fetch, parse and print the metrics snapshot, then the server's own
    /// stats if it has any. Fails only when the snapshot can't be fetched.
    pub async fn show_current_stats(&self) -> Result<()> {
        println!("📊 Current Load Testing Statistics");
        println!("==================================");
        println!("Target: {}", self.base_url);
        println!(
            "Timestamp: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        let report = match self.metrics_report().await {
            Ok(report) => report,
            Err(e) => {
                if matches!(e, TesterError::MetricsUnavailable { .. }) {
                    println!("❌ No active load test found. Start with: rust-load-tester");
                    println!("💡 Tip: Run load test first, then check stats in another terminal");
                }
                return Err(e);
            }
        };
        print!("{report}");

        println!("\n🖥️  Server Statistics:");
        println!("---------------------");
        match self.server_stats().await {
            Some(stats) => println!("{stats}"),
            None => println!("❌ Server stats not available"),
        }

        Ok(())
    }

    /// Rendered table for the current snapshot.
    pub async fn metrics_report(&self) -> Result<String> {
        let text = self.fetch_metrics().await?;
        let records = parser::parse_metrics(&text);
        debug!(records = records.len(), "parsed metrics snapshot");
        Ok(report::render_metrics(&records))
    }

    pub async fn fetch_metrics(&self) -> Result<String> {
        let url = &self.metrics_url;
        let res = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| TesterError::MetricsUnavailable {
                url: url.clone(),
                source,
            })?;

        res.text().await.map_err(|source| TesterError::MetricsBody {
            url: url.clone(),
            source,
        })
    }

    /// `GET {base}/api/stats`, pretty-printed. `None` if absent or unreadable.
    pub async fn server_stats(&self) -> Option<String> {
        let url = format!("{}/api/stats", self.base_url);
        let res = match self.client.get(&url).send().await {
            Ok(res) if res.status().is_success() => res,
            Ok(res) => {
                debug!(%url, status = %res.status(), "server stats not offered");
                return None;
            }
            Err(e) => {
                debug!(%url, error = %e, "server stats unreachable");
                return None;
            }
        };
        let body = res.text().await.ok()?;
        Some(report::render_server_stats(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{routing::get, Router};

    use crate::metrics::DurationSummary;
    use crate::testing::{serve, unreachable_url};

    #[tokio::test]
    async fn reads_back_a_published_snapshot() {
        let durations = Arc::new(DurationSummary::new());
        for ms in [40, 50, 60] {
            durations.record("http://t/health", "200", Duration::from_millis(ms));
        }
        let metrics = serve(crate::server::create_router(durations)).await;

        let viewer = StatsViewer::new(reqwest::Client::new(), "http://t", format!("{metrics}/metrics"));
        let report = viewer.metrics_report().await.unwrap();

        let row = report.lines().find(|l| l.starts_with("http://t/health")).unwrap();
        let cols: Vec<_> = row.split_whitespace().collect();
        assert_eq!(cols[1], "200");
        assert_eq!(cols[2], "3");
        assert_eq!(cols[4], "50.0");
    }

    #[tokio::test]
    async fn unreachable_metrics_is_an_error() {
        let viewer = StatsViewer::new(reqwest::Client::new(), "http://t", unreachable_url());
        let err = viewer.show_current_stats().await.unwrap_err();
        assert!(matches!(err, TesterError::MetricsUnavailable { .. }));
    }

    #[tokio::test]
    async fn server_stats_are_optional() {
        let with_stats = serve(Router::new().route("/api/stats", get(|| async { r#"{"images":2}"# }))).await;
        let viewer = StatsViewer::new(reqwest::Client::new(), with_stats, unreachable_url());
        assert_eq!(viewer.server_stats().await.unwrap(), "{\n  \"images\": 2\n}");

        let without = serve(Router::new()).await;
        let viewer = StatsViewer::new(reqwest::Client::new(), without, unreachable_url());
        assert!(viewer.server_stats().await.is_none());
    }
}
