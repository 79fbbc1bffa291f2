//! Engine configuration with serde-friendly defaults.

use crate::error::FeedError;
use serde::Deserialize;
use std::time::Duration;

/// Tunables for the feed engine.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Client-side batch size for the filtered subset.
    pub filter_batch_size: usize,
    /// Intersection ratio that counts as "scrolled into view".
    pub sentinel_threshold: f64,
    /// Attempts to find a not-yet-mounted sentinel before giving up.
    pub sentinel_retry_attempts: u32,
    /// Delay between sentinel lookup attempts, in milliseconds.
    pub sentinel_retry_delay_ms: u64,
    /// Interval for the log-viewer polling variant, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filter_batch_size: 100,
            sentinel_threshold: 0.9,
            sentinel_retry_attempts: 5,
            sentinel_retry_delay_ms: 200,
            poll_interval_ms: 5_000,
        }
    }
}

impl EngineConfig {
    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.filter_batch_size == 0 {
            return Err(FeedError::Config(
                "filter_batch_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sentinel_threshold) {
            return Err(FeedError::Config(format!(
                "sentinel_threshold must be within 0.0..=1.0, got {}",
                self.sentinel_threshold
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(FeedError::Config(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay between sentinel lookup attempts.
    pub fn sentinel_retry_delay(&self) -> Duration {
        Duration::from_millis(self.sentinel_retry_delay_ms)
    }

    /// Interval for the log-viewer polling variant.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = EngineConfig::default();
        assert_eq!(config.filter_batch_size, 100);
        assert_eq!(config.sentinel_threshold, 0.9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_partial_overrides() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "filter_batch_size": 25 }"#).expect("decode");
        assert_eq!(config.filter_batch_size, 25);
        assert_eq!(config.sentinel_threshold, 0.9);
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut config = EngineConfig::default();
        config.filter_batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.sentinel_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
