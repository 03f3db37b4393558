use serde::Deserialize;

use crate::aggregator::{AggregatorSettings, DEFAULT_RETENTION_MS};
use crate::models::History;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub feed: FeedConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Upstream telemetry service.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub base_url: String,
    #[serde(default = "default_machine_data_path")]
    pub machine_data_path: String,
    #[serde(default = "default_machine_count_path")]
    pub machine_count_path: String,
    #[serde(default = "default_test_input_path")]
    pub test_input_path: String,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Upper bound on a single feed request; a hung fetch delays at most one refresh by this much.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Upper bound on machine registration; `POST /api/machines` waits at most this long.
    #[serde(default = "default_registration_timeout_ms")]
    pub registration_timeout_ms: u64,
}

impl FeedConfig {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn default_machine_data_path() -> String {
    "/machine_data".into()
}

fn default_machine_count_path() -> String {
    "/update_machine_count".into()
}

fn default_test_input_path() -> String {
    "/update_test_input".into()
}

fn default_refresh_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_registration_timeout_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    #[serde(default = "default_feed_grace_cycles")]
    pub feed_grace_cycles: u32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            feed_grace_cycles: default_feed_grace_cycles(),
        }
    }
}

impl AggregatorConfig {
    pub fn settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            history_cap: self.history_cap,
            feed_grace_cycles: self.feed_grace_cycles,
        }
    }
}

fn default_history_cap() -> usize {
    History::DEFAULT_CAP
}

fn default_feed_grace_cycles() -> u32 {
    AggregatorSettings::default().feed_grace_cycles
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_chart_refresh_interval_ms(),
            retention_ms: default_retention_ms(),
        }
    }
}

fn default_chart_refresh_interval_ms() -> u64 {
    2000
}

fn default_retention_ms() -> u64 {
    DEFAULT_RETENTION_MS
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of dashboard views kept in the broadcast channel for /ws/machines (slow clients may lag).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_broadcast_capacity() -> usize {
    16
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log app stats (machines tracked, refreshes ok/failed) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        let base_url = self.feed.base_url.trim();
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "feed.base_url must be an http(s) URL, got {:?}",
            self.feed.base_url
        );
        for (key, path) in [
            ("feed.machine_data_path", &self.feed.machine_data_path),
            ("feed.machine_count_path", &self.feed.machine_count_path),
            ("feed.test_input_path", &self.feed.test_input_path),
        ] {
            anyhow::ensure!(
                path.starts_with('/'),
                "{} must start with '/', got {:?}",
                key,
                path
            );
        }
        anyhow::ensure!(
            self.feed.refresh_interval_ms > 0,
            "feed.refresh_interval_ms must be > 0, got {}",
            self.feed.refresh_interval_ms
        );
        anyhow::ensure!(
            self.feed.request_timeout_ms > 0,
            "feed.request_timeout_ms must be > 0, got {}",
            self.feed.request_timeout_ms
        );
        anyhow::ensure!(
            self.feed.registration_timeout_ms > 0,
            "feed.registration_timeout_ms must be > 0, got {}",
            self.feed.registration_timeout_ms
        );
        anyhow::ensure!(
            self.aggregator.history_cap > 0,
            "aggregator.history_cap must be > 0, got {}",
            self.aggregator.history_cap
        );
        anyhow::ensure!(
            self.chart.refresh_interval_ms > 0,
            "chart.refresh_interval_ms must be > 0, got {}",
            self.chart.refresh_interval_ms
        );
        anyhow::ensure!(
            self.chart.retention_ms > self.chart.refresh_interval_ms,
            "chart.retention_ms must be greater than chart.refresh_interval_ms, got {} <= {}",
            self.chart.retention_ms,
            self.chart.refresh_interval_ms
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}
