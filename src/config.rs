use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::error::{Result, TesterError};
use crate::load_generator::RampConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "rust-load-tester")]
#[command(about = "Ramp up virtual HTTP clients and report per-endpoint latency", long_about = None)]
pub struct Config {
    /// Maximum number of virtual clients
    #[arg(long, alias = "maxClients", env = "MAX_CLIENTS", default_value_t = 10)]
    pub max_clients: usize,

    /// Scale interval in milliseconds
    #[arg(long, alias = "scaleInterval", env = "SCALE_INTERVAL", default_value_t = 500)]
    pub scale_interval: u64,

    /// Random sleep from 0 to target microseconds
    #[arg(long, alias = "randomSleep", env = "RANDOM_SLEEP", default_value_t = 1000)]
    pub random_sleep: u64,

    /// Base URL for the target server
    #[arg(long, alias = "baseURL", env = "BASE_URL", default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Show current statistics and exit
    #[arg(long)]
    pub stats: bool,

    /// Address the client metrics server listens on
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8082")]
    pub metrics_addr: SocketAddr,

    /// Metrics endpoint read by `--stats`
    #[arg(long, env = "METRICS_URL", default_value = "http://localhost:8082/metrics")]
    pub metrics_url: String,

    /// Seconds to wait before the ramp starts
    #[arg(long, env = "STARTUP_DELAY", default_value_t = 5)]
    pub startup_delay: u64,

    /// Seconds between live table refreshes
    #[arg(long, env = "REFRESH_INTERVAL", default_value_t = 2)]
    pub refresh_interval: u64,

    /// Seconds to let workers finish after stopping before aborting them
    #[arg(long, env = "DRAIN_GRACE", default_value_t = 5)]
    pub drain_grace: u64,

    /// Per-request timeout in milliseconds (none by default)
    #[arg(long, env = "REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,
}

impl Config {
    pub fn ramp(&self) -> RampConfig {
        RampConfig {
            max_clients: self.max_clients,
            scale_interval: Duration::from_millis(self.scale_interval),
            random_sleep: Duration::from_micros(self.random_sleep),
            drain_grace: Duration::from_secs(self.drain_grace),
        }
    }

    /// Per-request jitter ceiling; workers reuse the scale interval.
    pub fn request_jitter(&self) -> Duration {
        Duration::from_millis(self.scale_interval)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval.max(1))
    }

    /// One pooled client shared by every worker.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = self.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        builder.build().map_err(TesterError::Client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_run() {
        let cfg = Config::try_parse_from(["rust-load-tester"]).unwrap();
        assert_eq!(cfg.max_clients, 10);
        assert_eq!(cfg.base_url, "http://localhost:8000");
        assert!(!cfg.stats);
        assert!(cfg.request_timeout_ms.is_none());

        let ramp = cfg.ramp();
        assert_eq!(ramp.scale_interval, Duration::from_millis(500));
        assert_eq!(ramp.random_sleep, Duration::from_micros(1000));
        assert_eq!(ramp.drain_grace, Duration::from_secs(5));
        assert_eq!(cfg.metrics_addr.port(), 8082);
    }

    #[test]
    fn camel_case_flags_are_accepted() {
        let cfg = Config::try_parse_from([
            "rust-load-tester",
            "--maxClients",
            "50",
            "--scaleInterval",
            "100",
            "--baseURL",
            "http://example:9000",
            "--stats",
        ])
        .unwrap();
        assert_eq!(cfg.max_clients, 50);
        assert_eq!(cfg.request_jitter(), Duration::from_millis(100));
        assert_eq!(cfg.base_url, "http://example:9000");
        assert!(cfg.stats);
    }
}
