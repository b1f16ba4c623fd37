use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;

// ─── Configuration ───────────────────────────────────────────────

/// Metric family published on `/metrics` and read back by the viewer.
pub const DURATION_FAMILY: &str = "tester_request_duration_seconds";

/// Quantiles exposed for every series.
const QUANTILES: &[f64] = &[0.5, 0.9, 0.99];

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Summary-style request duration metric, labelled by `path` and `status`.
/// Workers call `record()`, the metrics endpoint calls `render()`.
pub struct DurationSummary {
    series: Mutex<BTreeMap<(String, String), Series>>,
}

/// Point-in-time copy of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub path: String,
    pub status: String,
    /// `(quantile, seconds)`
    pub quantiles: Vec<(f64, f64)>,
    pub sum_secs: f64,
    pub count: u64,
}

struct Series {
    hist: Histogram<u64>,
    sum_secs: f64,
    count: u64,
}

impl Series {
    fn new() -> Self {
        Self {
            hist: Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
                .expect("histogram creation"),
            sum_secs: 0.0,
            count: 0,
        }
    }
}

// ─── DurationSummary impl ────────────────────────────────────────

impl DurationSummary {
    pub fn new() -> Self {
        Self {
            series: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn record(&self, path: &str, status: &str, duration: Duration) {
        // Clamp to ≥ 1 μs; values past the upper bound saturate
        let us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX).max(HIST_LOW);

        let mut series = self.series.lock();
        let s = series
            .entry((path.to_owned(), status.to_owned()))
            .or_insert_with(Series::new);
        s.hist.saturating_record(us);
        s.sum_secs += duration.as_secs_f64();
        s.count += 1;
    }

    /// Copy of every series, ordered by `(path, status)`. Quantiles are
    /// read under the lock; nothing is formatted while it is held.
    pub fn snapshot(&self) -> Vec<SeriesSnapshot> {
        let series = self.series.lock();
        series
            .iter()
            .map(|((path, status), s)| SeriesSnapshot {
                path: path.clone(),
                status: status.clone(),
                quantiles: QUANTILES
                    .iter()
                    .map(|q| (*q, s.hist.value_at_quantile(*q) as f64 / 1_000_000.0))
                    .collect(),
                sum_secs: s.sum_secs,
                count: s.count,
            })
            .collect()
    }

    /// Text exposition of every series, ordered by `(path, status)`.
    pub fn render(&self) -> String {
        let series = self.snapshot();

        let mut out = String::with_capacity(256 + series.len() * 512);
        let _ = writeln!(out, "# HELP {DURATION_FAMILY} Duration of the request.");
        let _ = writeln!(out, "# TYPE {DURATION_FAMILY} summary");

        for s in &series {
            let labels = format!(
                "path=\"{}\",status=\"{}\"",
                escape_label(&s.path),
                escape_label(&s.status)
            );
            for (q, secs) in &s.quantiles {
                let _ = writeln!(out, "{DURATION_FAMILY}{{{labels},quantile=\"{q}\"}} {secs}");
            }
            let _ = writeln!(out, "{DURATION_FAMILY}_sum{{{labels}}} {}", s.sum_secs);
            let _ = writeln!(out, "{DURATION_FAMILY}_count{{{labels}}} {}", s.count);
        }

        out
    }
}

impl Default for DurationSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a label value for the text exposition format.
fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}
