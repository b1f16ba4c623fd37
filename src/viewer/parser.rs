//! Line-oriented reader for the duration family of the text exposition format.
//!
//! Each sample line is `name{label="value",...} value [timestamp]`. The
//! label block is scanned by hand (quote and escape aware), so label values
//! containing spaces, commas or braces do not confuse the split. Anything
//! malformed degrades to an empty label or a zero value rather than an error.

use std::collections::BTreeMap;

use crate::metrics::exposition::DURATION_FAMILY;

/// Observation window assumed by `MetricRecord::approx_rps`. The snapshot
/// carries no timestamps, so this is a fixed approximation, not a measurement.
pub const ASSUMED_WINDOW_SECS: f64 = 60.0;

/// `(endpoint, status)`
pub type RecordKey = (String, String);

/// Aggregate for one `(endpoint, status)` pair of a metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRecord {
    pub endpoint: String,
    pub status: String,
    pub count: u64,
    /// Cumulative duration in seconds
    pub sum: f64,
    /// 0.9 quantile in seconds, when the snapshot carried one
    pub p90: Option<f64>,
}

impl MetricRecord {
    /// Mean latency in ms; 0 when nothing was counted.
    pub fn avg_latency_ms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64 * 1000.0
    }

    pub fn p90_ms(&self) -> Option<f64> {
        self.p90.map(|q| q * 1000.0)
    }

    /// `count / 60`: only a true rate if the run lasted exactly one minute.
    pub fn approx_rps(&self) -> f64 {
        self.count as f64 / ASSUMED_WINDOW_SECS
    }
}

enum SeriesKind {
    Quantile,
    Count,
    Sum,
    Other,
}

/// Parse a full snapshot. Records are rebuilt from scratch on every call.
pub fn parse_metrics(text: &str) -> BTreeMap<RecordKey, MetricRecord> {
    let mut records: BTreeMap<RecordKey, MetricRecord> = BTreeMap::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, block, value)) = split_sample(line) else {
            continue;
        };
        let Some(kind) = series_kind(name) else {
            continue;
        };

        let value = parse_value(value);
        let labels = parse_labels(block);
        let endpoint = label(&labels, "path");
        let status = label(&labels, "status");

        let record = records
            .entry((endpoint.clone(), status.clone()))
            .or_insert_with(|| MetricRecord {
                endpoint,
                status,
                ..Default::default()
            });

        match kind {
            // `as` saturates: negatives become 0
            SeriesKind::Count => record.count = value as u64,
            SeriesKind::Sum => record.sum = value,
            SeriesKind::Quantile if label(&labels, "quantile") == "0.9" => {
                record.p90 = Some(value)
            }
            SeriesKind::Quantile | SeriesKind::Other => {}
        }
    }

    records
}

/// Which series of the duration family `name` is, if any.
fn series_kind(name: &str) -> Option<SeriesKind> {
    let rest = name.strip_prefix(DURATION_FAMILY)?;
    match rest {
        "" => Some(SeriesKind::Quantile),
        "_count" => Some(SeriesKind::Count),
        "_sum" => Some(SeriesKind::Sum),
        _ if rest.starts_with('_') => Some(SeriesKind::Other),
        _ => None,
    }
}

/// Non-numeric and non-finite values read as 0.
fn parse_value(token: &str) -> f64 {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Split a sample line into `(name, label block, value token)`.
fn split_sample(line: &str) -> Option<(&str, &str, &str)> {
    match line.find('{') {
        Some(open) => {
            let close = closing_brace(line, open)?;
            let value = line[close + 1..].split_whitespace().next().unwrap_or("");
            Some((line[..open].trim(), &line[open + 1..close], value))
        }
        None => {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            Some((name, "", parts.next().unwrap_or("")))
        }
    }
}

/// Byte index of the `}` closing the block opened at `open`.
fn closing_brace(line: &str, open: usize) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, b) in line.bytes().enumerate().skip(open + 1) {
        match b {
            _ if escaped => escaped = false,
            b'\\' if in_quotes => escaped = true,
            b'"' => in_quotes = !in_quotes,
            b'}' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// `key="value"` pairs of a label block, unescaping values.
/// Stops at the first malformed pair and keeps what came before it.
fn parse_labels(block: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut chars = block.chars().peekable();

    loop {
        while chars.next_if(|c| *c == ',' || c.is_whitespace()).is_some() {}

        let mut key = String::new();
        loop {
            match chars.next() {
                Some('=') => break,
                Some(c) => key.push(c),
                None => return out,
            }
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.next() != Some('"') {
            return out;
        }

        let mut value = String::new();
        loop {
            match chars.next() {
                Some('"') => break,
                Some('\\') => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some(c) => value.push(c),
                    None => return out,
                },
                Some(c) => value.push(c),
                None => return out,
            }
        }

        out.push((key.trim().to_owned(), value));
    }
}

fn label(labels: &[(String, String)], name: &str) -> String {
    labels
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}
