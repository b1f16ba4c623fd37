use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::metrics::table::shorten;

use super::parser::{MetricRecord, RecordKey, ASSUMED_WINDOW_SECS};

/// Table of P90 / average latency and approximate RPS per endpoint+status.
/// Records with a zero count are left out.
pub fn render_metrics(records: &BTreeMap<RecordKey, MetricRecord>) -> String {
    if records.is_empty() {
        return "❌ No metrics found. Load test may not be running.\n".into();
    }

    let mut out = String::new();
    let _ = writeln!(out, "🎯 Load Test Results:");
    let _ = writeln!(out, "---------------------");
    let _ = writeln!(
        out,
        "{:<35} {:<7} {:<8} {:<10} {:<10} {:<10}",
        "Endpoint", "Status", "Requests", "P90(ms)", "Avg(ms)", "~RPS"
    );
    let _ = writeln!(out, "{}", "-".repeat(85));

    let mut total_requests = 0u64;
    for r in records.values().filter(|r| r.count > 0) {
        let p90 = r
            .p90_ms()
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "-".into());
        let _ = writeln!(
            out,
            "{:<35} {:<7} {:<8} {:<10} {:<10.1} {:<10.1}",
            shorten(&r.endpoint, 34),
            r.status,
            r.count,
            p90,
            r.avg_latency_ms(),
            r.approx_rps(),
        );
        total_requests += r.count;
    }

    let _ = writeln!(out, "{}", "-".repeat(85));
    let _ = writeln!(out, "Total Requests: {total_requests}");
    let _ = writeln!(
        out,
        "~RPS is count / {ASSUMED_WINDOW_SECS:.0}s: an estimate that assumes a one-minute window, not a measured rate."
    );

    out
}

/// Pretty-print a JSON body, or return it unchanged if it isn't JSON.
pub fn render_server_stats(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_owned()),
        Err(_) => body.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::parser::parse_metrics;

    #[test]
    fn zero_count_records_are_hidden() {
        let records = parse_metrics(
            "\
tester_request_duration_seconds_count{path=\"/idle\",status=\"200\"} 0
tester_request_duration_seconds_sum{path=\"/idle\",status=\"200\"} 0
tester_request_duration_seconds_count{path=\"/health\",status=\"200\"} 42
tester_request_duration_seconds_sum{path=\"/health\",status=\"200\"} 2.1
tester_request_duration_seconds{path=\"/health\",status=\"200\",quantile=\"0.9\"} 0.08
",
        );
        let out = render_metrics(&records);

        assert!(!out.contains("/idle"));
        let row = out.lines().find(|l| l.starts_with("/health")).unwrap();
        let cols: Vec<_> = row.split_whitespace().collect();
        assert_eq!(cols, ["/health", "200", "42", "80.0", "50.0", "0.7"]);
        assert!(out.contains("Total Requests: 42"));
        assert!(out.contains("one-minute window"));
    }

    #[test]
    fn missing_p90_is_a_dash() {
        let records = parse_metrics("tester_request_duration_seconds_count{path=\"/a\",status=\"503\"} 6");
        let out = render_metrics(&records);
        let row = out.lines().find(|l| l.starts_with("/a")).unwrap();
        let cols: Vec<_> = row.split_whitespace().collect();
        assert_eq!(cols, ["/a", "503", "6", "-", "0.0", "0.1"]);
    }

    #[test]
    fn empty_snapshot_says_so() {
        assert!(render_metrics(&BTreeMap::new()).contains("No metrics found"));
    }

    #[test]
    fn server_stats_are_pretty_printed() {
        assert_eq!(render_server_stats(r#"{"devices":3}"#), "{\n  \"devices\": 3\n}");
        assert_eq!(render_server_stats("plain text"), "plain text");
    }
}
