use std::sync::Arc;
use std::time::Duration;

use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use super::collector::StatsCollector;
use super::table;

/// Clear the terminal and redraw the live table every `period` until cancelled.
/// Prints nothing while no request has completed yet.
pub async fn run(collector: Arc<StatsCollector>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    // The first tick fires immediately; skip it so the first frame has data
    interval.tick().await;
    let mut ticks = IntervalStream::new(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            tick = ticks.next() => {
                if tick.is_none() {
                    break;
                }
                let snapshot = collector.snapshot();
                if let Some(frame) = table::render_table(&snapshot, chrono::Local::now()) {
                    print!("\x1b[2J\x1b[H");
                    print!("{frame}");
                }
            }
        }
    }
}
