use serde::Deserialize;
use std::time::Duration;

use crate::network::{DEFAULT_IP_LOOKUP_URL, DEFAULT_SPEED_TEST_URL};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Collector tuning. Durations must be non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    /// Period of the background refresh.
    pub collection_interval: Duration,

    /// Upper bound for one refresh, probes included
    pub refresh_timeout: Duration,

    /// Delay before the enhanced-experience offer is shown
    pub offer_delay: Duration,

    /// How long to wait on the geolocation permission before falling back to
    /// the IP lookup. Keep it below `refresh_timeout`.
    pub geolocation_timeout: Duration,

    pub speed_test_url: String,
    pub ip_lookup_url: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            collection_interval: Duration::from_millis(60_000),
            refresh_timeout: Duration::from_secs(10),
            offer_delay: Duration::from_secs(30),
            geolocation_timeout: Duration::from_secs(5),
            speed_test_url: DEFAULT_SPEED_TEST_URL.to_string(),
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
        }
    }
}

impl CollectorConfig {
    /// Defaults overridden by `LOLA_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = env_millis("LOLA_COLLECTION_INTERVAL_MS") {
            config.collection_interval = ms;
        }
        if let Ok(url) = std::env::var("LOLA_SPEED_TEST_URL") {
            config.speed_test_url = url;
        }
        if let Ok(url) = std::env::var("LOLA_IP_LOOKUP_URL") {
            config.ip_lookup_url = url;
        }

        let debug_mode = std::env::var("LOLA_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            config.offer_delay = Duration::from_secs(1);
        }

        config
    }

    /// Apply `options` on top of this config. Zero durations are rejected
    /// and the current value kept.
    pub fn merged(&self, options: &CollectorOptions) -> Self {
        let mut merged = self.clone();
        apply_millis(
            &mut merged.collection_interval,
            options.collection_interval,
            "collectionInterval",
        );
        apply_millis(&mut merged.refresh_timeout, options.refresh_timeout, "refreshTimeout");
        apply_millis(&mut merged.offer_delay, options.offer_delay, "offerDelay");
        apply_millis(
            &mut merged.geolocation_timeout,
            options.geolocation_timeout,
            "geolocationTimeout",
        );
        merged
    }
}

/// Caller-supplied overrides, all in milliseconds, for
/// [`DataCollector::initialize`](super::DataCollector::initialize).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectorOptions {
    pub collection_interval: Option<u64>,
    pub refresh_timeout: Option<u64>,
    pub offer_delay: Option<u64>,
    pub geolocation_timeout: Option<u64>,
}

impl CollectorOptions {
    pub fn with_collection_interval(mut self, interval: Duration) -> Self {
        self.collection_interval = Some(duration_millis(interval));
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(duration_millis(timeout));
        self
    }

    pub fn with_offer_delay(mut self, delay: Duration) -> Self {
        self.offer_delay = Some(duration_millis(delay));
        self
    }

    pub fn with_geolocation_timeout(mut self, timeout: Duration) -> Self {
        self.geolocation_timeout = Some(duration_millis(timeout));
        self
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn apply_millis(target: &mut Duration, value: Option<u64>, name: &str) {
    match value {
        Some(0) => log_warn!("ignoring zero {name}; keeping {:?}", target),
        Some(ms) => *target = Duration::from_millis(ms),
        None => {}
    }
}

fn env_millis(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            log_warn!("ignoring invalid {var}={raw}");
            None
        }
        Ok(ms) => Some(Duration::from_millis(ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::default();
        assert_eq!(config.collection_interval, Duration::from_millis(60_000));
        assert_eq!(config.offer_delay, Duration::from_secs(30));
        assert!(config.geolocation_timeout < config.refresh_timeout);
    }

    #[test]
    fn test_merge_options_over_defaults() {
        let options: CollectorOptions =
            serde_json::from_str(r#"{"collectionInterval": 5000, "geolocationTimeout": 750}"#)
                .unwrap();
        let merged = CollectorConfig::default().merged(&options);

        assert_eq!(merged.collection_interval, Duration::from_millis(5000));
        assert_eq!(merged.refresh_timeout, Duration::from_secs(10));
        assert_eq!(merged.offer_delay, Duration::from_secs(30));
        assert_eq!(merged.geolocation_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let options = CollectorOptions {
            collection_interval: Some(0),
            ..CollectorOptions::default()
        };
        let merged = CollectorConfig::default().merged(&options);
        assert_eq!(merged.collection_interval, Duration::from_millis(60_000));
    }

    #[test]
    fn test_builder_methods() {
        let options = CollectorOptions::default()
            .with_collection_interval(Duration::from_millis(250))
            .with_offer_delay(Duration::from_secs(2));
        assert_eq!(options.collection_interval, Some(250));
        assert_eq!(options.offer_delay, Some(2000));
        assert_eq!(options.refresh_timeout, None);
    }
}
