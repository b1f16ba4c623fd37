use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod error;
mod load_generator;
mod metrics;
mod server;
mod viewer;

#[cfg(test)]
mod testing;

use config::Config;
use load_generator::request::RequestExecutor;
use load_generator::{target_endpoints, RampController};
use metrics::{DurationSummary, StatsCollector};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so the live table owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    if config.stats {
        let viewer = viewer::StatsViewer::new(
            config.http_client()?,
            config.base_url.clone(),
            config.metrics_url.clone(),
        );
        return Ok(match viewer.show_current_stats().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "error showing stats");
                ExitCode::FAILURE
            }
        });
    }

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   🚦  HTTP RAMP LOAD TESTER                      ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    run_load_test(config).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_load_test(config: Config) -> anyhow::Result<()> {
    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        target = %config.base_url,
        max_clients = config.max_clients,
        scale_interval_ms = config.scale_interval,
        "load test configured"
    );

    // ── 1. Shared metric sinks ───────────────────────────────────
    let stats = Arc::new(StatsCollector::new());
    let durations = Arc::new(DurationSummary::new());

    // ── 2. Metrics endpoint (a taken port is fatal) ──────────────
    let listener = server::bind(config.metrics_addr)
        .await
        .context("starting client metrics server")?;
    let router = server::create_router(durations.clone());
    tokio::spawn(async move {
        if let Err(e) = server::serve(listener, router).await {
            error!(error = %e, "client metrics server failed");
            std::process::exit(1);
        }
    });

    // ── 3. Stop signal ───────────────────────────────────────────
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(watch_interrupts(cancel.clone(), stats.clone()));

    // ── 4. Give the target time to come up ───────────────────────
    info!(delay_secs = config.startup_delay, "waiting before ramp");
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(config.startup_delay()) => {}
    }

    // ── 5. Live table ────────────────────────────────────────────
    let live = tokio::spawn(metrics::live::run(
        stats.clone(),
        config.refresh_interval(),
        cancel.clone(),
    ));

    // ── 6. Ramp until stopped ────────────────────────────────────
    let executor = Arc::new(RequestExecutor::new(
        config.http_client()?,
        stats.clone(),
        durations,
        config.request_jitter(),
    ));
    let ramp = RampController::new(
        config.ramp(),
        target_endpoints(&config.base_url),
        executor,
        cancel.clone(),
    );
    let workers = ramp.run().await;

    cancel.cancel();
    interrupt.abort();
    join_logged("live table", live).await;

    // ── 7. Final summary ─────────────────────────────────────────
    print!("{}", metrics::table::render_summary(&stats.snapshot()));
    info!(%run_id, workers, "load test finished");

    Ok(())
}

/// First Ctrl+C stops the ramp gracefully. The second one skips the drain:
/// print what was collected and exit straight away.
async fn watch_interrupts(cancel: CancellationToken, stats: Arc<StatsCollector>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    info!("interrupt received, draining (press Ctrl+C again to force exit)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("second interrupt, exiting without waiting for workers");
        print!("{}", metrics::table::render_summary(&stats.snapshot()));
        std::process::exit(130);
    }
}

/// Await a background task, logging a panic instead of dropping it.
async fn join_logged(task: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(task, error = %e, "background task ended abnormally");
            false
        }
    }
}
