//! Drain and ingest loop configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for queue drains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainConfig {
    /// Length of one receive window (seconds).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Upper bound on messages fetched per pull request.
    #[serde(default = "default_max_messages_per_pull")]
    pub max_messages_per_pull: usize,

    /// Pause between pulls when the subscription is empty (milliseconds).
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Delivery attempt at which an undecodable message is acked and
    /// dead-lettered instead of nacked (0 = never).
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,
}

fn default_window_secs() -> u64 {
    7
}

fn default_max_messages_per_pull() -> usize {
    100
}

fn default_idle_poll_ms() -> u64 {
    250
}

fn default_max_delivery_attempts() -> u32 {
    5
}

impl DrainConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_messages_per_pull: default_max_messages_per_pull(),
            idle_poll_ms: default_idle_poll_ms(),
            max_delivery_attempts: default_max_delivery_attempts(),
        }
    }
}

/// Configuration for the background ingest loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Start the loop with the server.
    /// When disabled, refreshes only happen through the API.
    #[serde(default)]
    pub enabled: bool,

    /// Delay between the end of one refresh and the start of the next
    /// (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    60_000 // 1 minute
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let drain = DrainConfig::default();
        assert_eq!(drain.window(), Duration::from_secs(7));
        assert_eq!(drain.max_messages_per_pull, 100);
        assert_eq!(drain.idle_poll(), Duration::from_millis(250));
        assert_eq!(drain.max_delivery_attempts, 5);

        let ingest = IngestConfig::default();
        assert!(!ingest.enabled);
        assert_eq!(ingest.poll_interval_ms, 60_000);
    }

    #[test]
    fn test_deserialize_minimal() {
        let drain: DrainConfig = toml::from_str("window_secs = 3").unwrap();
        assert_eq!(drain.window_secs, 3);
        assert_eq!(drain.max_delivery_attempts, 5);

        let ingest: IngestConfig = toml::from_str("enabled = true").unwrap();
        assert!(ingest.enabled);
        assert_eq!(ingest.poll_interval_ms, 60_000);
    }
}
