use std::net::SocketAddr;

/// Failures that abort an operation. Per-request errors never become one of
/// these; workers fold them into the statistics instead.
#[derive(Debug, thiserror::Error)]
pub enum TesterError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("metrics endpoint {url} is unreachable: {source}")]
    MetricsUnavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read metrics from {url}: {source}")]
    MetricsBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot bind metrics server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics server exited: {0}")]
    Serve(#[source] std::io::Error),
}

pub type Result<T, E = TesterError> = std::result::Result<T, E>;
