//! Broker and consumer-loop configuration

use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse, env_required};
use std::time::Duration;

/// Where and how to subscribe.
///
/// One topic maps to one Redis stream; the consumer group is the subscription.
/// `consumer_name` must stay the same across restarts so that entries left
/// unacknowledged by a previous run are replayed to this consumer.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub topic: String,
    pub consumer_group: String,
    pub consumer_name: String,

    /// Entries requested per read
    pub batch_size: usize,

    /// `XREADGROUP BLOCK` in milliseconds; `None` polls instead
    pub block_ms: Option<u64>,

    /// Sleep between empty polls
    pub poll_interval_ms: u64,

    /// Approximate `MAXLEN` applied by the producer
    pub max_length: u64,
}

impl BrokerConfig {
    pub const DEFAULT_GROUP: &'static str = "notification-service";
    pub const DEFAULT_CONSUMER: &'static str = "notification-service-1";

    pub fn new(url: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            topic: topic.into(),
            consumer_group: Self::DEFAULT_GROUP.to_string(),
            consumer_name: Self::DEFAULT_CONSUMER.to_string(),
            batch_size: 10,
            block_ms: None,
            poll_interval_ms: 500,
            max_length: 100_000,
        }
    }

    pub fn with_consumer_group(mut self, group: impl Into<String>) -> Self {
        self.consumer_group = group.into();
        self
    }

    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_blocking(mut self, block_ms: Option<u64>) -> Self {
        self.block_ms = block_ms;
        self
    }

    pub fn with_poll_interval_ms(mut self, interval: u64) -> Self {
        self.poll_interval_ms = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl FromEnv for BrokerConfig {
    /// - `BROKER_URL` (required)
    /// - `BROKER_TOPIC` (required)
    /// - `BROKER_CONSUMER_GROUP` (default `notification-service`)
    /// - `BROKER_CONSUMER_NAME` (default `notification-service-1`)
    /// - `BROKER_BATCH_SIZE` (default 10)
    /// - `BROKER_BLOCK_MS` (unset: poll)
    /// - `BROKER_POLL_INTERVAL_MS` (default 500)
    /// - `BROKER_MAX_LENGTH` (default 100000)
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::new(String::new(), String::new());

        let block_ms = match env_optional("BROKER_BLOCK_MS") {
            Some(raw) => Some(raw.parse().map_err(|e| ConfigError::ParseError {
                key: "BROKER_BLOCK_MS".to_string(),
                details: format!("{}", e),
            })?),
            None => None,
        };

        let batch_size: usize = env_parse("BROKER_BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid("BROKER_BATCH_SIZE must be at least 1".into()));
        }

        Ok(Self {
            url: env_required("BROKER_URL")?,
            topic: env_required("BROKER_TOPIC")?,
            consumer_group: env_or_default("BROKER_CONSUMER_GROUP", Self::DEFAULT_GROUP),
            consumer_name: env_or_default("BROKER_CONSUMER_NAME", Self::DEFAULT_CONSUMER),
            batch_size,
            block_ms,
            poll_interval_ms: env_parse("BROKER_POLL_INTERVAL_MS", defaults.poll_interval_ms)?,
            max_length: env_parse("BROKER_MAX_LENGTH", defaults.max_length)?,
        })
    }
}

/// Timing of the fetch → handle → commit loop
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Fixed pause after a failed fetch
    pub fetch_retry_delay: Duration,

    /// Deadline for handling a single message
    pub process_timeout: Duration,
}

impl ConsumerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_retry_delay(mut self, delay: Duration) -> Self {
        self.fetch_retry_delay = delay;
        self
    }

    pub fn with_process_timeout(mut self, timeout: Duration) -> Self {
        self.process_timeout = timeout;
        self
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            fetch_retry_delay: Duration::from_secs(1),
            process_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROKER_VARS: [&str; 8] = [
        "BROKER_URL",
        "BROKER_TOPIC",
        "BROKER_CONSUMER_GROUP",
        "BROKER_CONSUMER_NAME",
        "BROKER_BATCH_SIZE",
        "BROKER_BLOCK_MS",
        "BROKER_POLL_INTERVAL_MS",
        "BROKER_MAX_LENGTH",
    ];

    fn broker_env(set: &[(&str, &'static str)]) -> Vec<(&'static str, Option<&'static str>)> {
        BROKER_VARS
            .iter()
            .map(|key| {
                let value = set.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
                (*key, value)
            })
            .collect()
    }

    #[test]
    fn test_broker_config_from_env_defaults() {
        let vars = broker_env(&[
            ("BROKER_URL", "redis://localhost:6379"),
            ("BROKER_TOPIC", "user-events"),
        ]);

        temp_env::with_vars(vars, || {
            let config = BrokerConfig::from_env().unwrap();
            assert_eq!(config.topic, "user-events");
            assert_eq!(config.consumer_group, "notification-service");
            assert_eq!(config.consumer_name, "notification-service-1");
            assert_eq!(config.block_ms, None);
            assert_eq!(config.batch_size, 10);
        });
    }

    #[test]
    fn test_broker_config_requires_url_and_topic() {
        let vars = broker_env(&[("BROKER_URL", "redis://localhost:6379")]);

        temp_env::with_vars(vars, || {
            let err = BrokerConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("BROKER_TOPIC"));
        });

        temp_env::with_vars(broker_env(&[]), || {
            let err = BrokerConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("BROKER_URL"));
        });
    }

    #[test]
    fn test_broker_config_parses_blocking() {
        let vars = broker_env(&[
            ("BROKER_URL", "redis://localhost:6379"),
            ("BROKER_TOPIC", "user-events"),
            ("BROKER_BLOCK_MS", "2000"),
        ]);

        temp_env::with_vars(vars, || {
            assert_eq!(BrokerConfig::from_env().unwrap().block_ms, Some(2000));
        });
    }

    #[test]
    fn test_consumer_config_defaults() {
        let config = ConsumerConfig::default();
        assert_eq!(config.fetch_retry_delay, Duration::from_secs(1));
        assert_eq!(config.process_timeout, Duration::from_secs(30));
    }
}
