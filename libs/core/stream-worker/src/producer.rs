//! Publishes events onto a Redis stream in the format [`crate::RedisStreamSource`] reads.

use crate::config::BrokerConfig;
use crate::consumer::{KEY_FIELD, VALUE_FIELD};
use crate::error::StreamError;
use redis::aio::ConnectionManager;
use serde::Serialize;
use tracing::debug;

#[derive(Clone)]
pub struct StreamProducer {
    redis: ConnectionManager,
    topic: String,
    max_length: u64,
}

impl StreamProducer {
    pub fn new(redis: ConnectionManager, topic: impl Into<String>) -> Self {
        Self {
            redis,
            topic: topic.into(),
            max_length: 100_000,
        }
    }

    pub fn from_config(redis: ConnectionManager, config: &BrokerConfig) -> Self {
        Self::new(redis, config.topic.clone()).with_max_length(config.max_length)
    }

    /// Approximate stream cap (`MAXLEN ~`)
    pub fn with_max_length(mut self, max_length: u64) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Append raw bytes; returns the entry id
    pub async fn publish(&self, key: Option<&str>, payload: &[u8]) -> Result<String, StreamError> {
        let mut conn = self.redis.clone();

        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.topic)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg(VALUE_FIELD)
            .arg(payload);
        if let Some(key) = key {
            cmd.arg(KEY_FIELD).arg(key);
        }

        let entry_id: String = cmd.query_async(&mut conn).await?;
        debug!(stream = %self.topic, entry_id = %entry_id, "Published event");
        Ok(entry_id)
    }

    pub async fn publish_json<T: Serialize>(
        &self,
        key: Option<&str>,
        event: &T,
    ) -> Result<String, StreamError> {
        let payload = serde_json::to_vec(event)?;
        self.publish(key, &payload).await
    }
}
