use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Local};

use super::collector::percentage;
use super::EndpointStats;

const RULE: &str = "------------------------------------------------------------";

/// Keep the last `max - 3` characters behind a "..." prefix when too long.
pub(crate) fn shorten(endpoint: &str, max: usize) -> String {
    let len = endpoint.chars().count();
    if len <= max {
        return endpoint.to_owned();
    }
    let keep = max.saturating_sub(3);
    let tail: String = endpoint.chars().skip(len - keep).collect();
    format!("...{tail}")
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

// ─── Live table ──────────────────────────────────────────────────

/// Render the auto-refreshing table. `None` until anything was recorded.
pub fn render_table(stats: &BTreeMap<String, EndpointStats>, now: DateTime<Local>) -> Option<String> {
    if stats.is_empty() {
        return None;
    }

    let mut out = String::new();
    let _ = writeln!(out, "🔄 Live Load Testing Results");
    let _ = writeln!(out, "============================================================");
    let _ = writeln!(
        out,
        "{:<25} {:<8} {:<8} {:<8} {:<8} {:<8} {:<8}",
        "Endpoint", "Total", "Success", "Errors", "Min(ms)", "Max(ms)", "Avg(ms)"
    );
    let _ = writeln!(out, "{RULE}");

    let (mut total, mut success, mut errors) = (0u64, 0u64, 0u64);

    // BTreeMap iteration is already sorted by endpoint
    for (endpoint, s) in stats {
        let _ = writeln!(
            out,
            "{:<25} {:<8} {:<8} {:<8} {:<8.1} {:<8.1} {:<8.1}",
            shorten(endpoint, 24),
            s.total_requests,
            s.success_requests,
            s.error_requests,
            as_ms(s.min_time),
            as_ms(s.max_time),
            as_ms(s.avg_time()),
        );
        total += s.total_requests;
        success += s.success_requests;
        errors += s.error_requests;
    }

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{:<25} {:<8} {:<8} {:<8}", "TOTAL", total, success, errors);
    let _ = writeln!(
        out,
        "\nLast update: {} | Press Ctrl+C to stop",
        now.format("%H:%M:%S")
    );

    Some(out)
}

// ─── One-shot summary ────────────────────────────────────────────

pub fn render_summary(stats: &BTreeMap<String, EndpointStats>) -> String {
    if stats.is_empty() {
        return "No statistics collected yet.\n".into();
    }

    let mut out = String::new();
    let _ = writeln!(out, "\n📊 Load Testing Summary");
    let _ = writeln!(out, "=======================");

    let (mut total, mut success, mut errors) = (0u64, 0u64, 0u64);

    for (endpoint, s) in stats {
        let _ = writeln!(out, "\n🔗 {endpoint}");
        let _ = writeln!(
            out,
            "   Requests: {} (Success: {}, Errors: {})",
            s.total_requests, s.success_requests, s.error_requests
        );
        let _ = writeln!(out, "   Success Rate: {:.1}%", s.success_rate());
        let _ = writeln!(
            out,
            "   Response Time: Min={:.1}ms, Max={:.1}ms, Avg={:.1}ms",
            as_ms(s.min_time),
            as_ms(s.max_time),
            as_ms(s.avg_time())
        );
        total += s.total_requests;
        success += s.success_requests;
        errors += s.error_requests;
    }

    let overall = percentage(success, total);
    let error_rate = percentage(errors, total);

    let _ = writeln!(out, "\n🎯 Overall Results:");
    let _ = writeln!(out, "   Total Requests: {total}");
    let _ = writeln!(out, "   Success Rate: {overall:.1}% ({success}/{total})");
    let _ = writeln!(out, "   Error Rate: {error_rate:.1}% ({errors}/{total})");

    out
}
