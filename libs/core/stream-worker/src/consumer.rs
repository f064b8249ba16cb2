//! Redis Streams implementation of [`MessageSource`]
//!
//! Commit is `XACK`. On start the consumer replays its own pending entries
//! (delivered to this consumer name but never acknowledged) before reading
//! new ones, which is how a failed message comes back after a restart.

use crate::config::BrokerConfig;
use crate::error::StreamError;
use crate::message::{MessageId, StreamMessage};
use crate::source::MessageSource;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamId, StreamReadReply};
use redis::RedisResult;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Field holding the event JSON
pub const VALUE_FIELD: &str = "value";
/// Optional partitioning key
pub const KEY_FIELD: &str = "key";

enum ReadMode {
    /// Replaying this consumer's pending entries after the given id
    Pending(String),
    New,
}

pub struct RedisStreamSource {
    redis: Option<ConnectionManager>,
    config: BrokerConfig,
    mode: ReadMode,
    buffer: VecDeque<StreamMessage>,
}

impl RedisStreamSource {
    /// Create the source and make sure the consumer group exists
    pub async fn connect(redis: ConnectionManager, config: BrokerConfig) -> Result<Self, StreamError> {
        let source = Self {
            redis: Some(redis),
            config,
            mode: ReadMode::Pending("0".to_string()),
            buffer: VecDeque::new(),
        };
        source.ensure_consumer_group().await?;

        info!(
            stream = %source.config.topic,
            group = %source.config.consumer_group,
            consumer = %source.config.consumer_name,
            "Subscribed to stream"
        );
        Ok(source)
    }

    fn conn(&self) -> Result<ConnectionManager, StreamError> {
        self.redis.clone().ok_or(StreamError::Closed)
    }

    async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = self.conn()?;

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.topic)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => {
                info!(stream = %self.config.topic, group = %self.config.consumer_group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    async fn read(&self, start: &str, block: Option<u64>) -> Result<Vec<StreamId>, StreamError> {
        let mut conn = self.conn()?;

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_name);
        if let Some(ms) = block {
            cmd.arg("BLOCK").arg(ms);
        }
        cmd.arg("COUNT")
            .arg(self.config.batch_size)
            .arg("STREAMS")
            .arg(&self.config.topic)
            .arg(start);

        let reply: Option<StreamReadReply> = cmd.query_async(&mut conn).await?;

        Ok(reply
            .map(|r| r.keys.into_iter().flat_map(|k| k.ids).collect())
            .unwrap_or_default())
    }

    /// Entries whose body was trimmed away can never be handled; acknowledge and drop them.
    async fn discard(&self, entry_id: &str) {
        warn!(stream = %self.config.topic, entry_id, "Entry has no value field, discarding");
        if let Err(e) = self.ack(entry_id).await {
            warn!(entry_id, error = %e, "Failed to acknowledge discarded entry, it stays pending");
        }
    }

    async fn ack(&self, entry_id: &str) -> Result<(), StreamError> {
        let mut conn = self.conn()?;
        let _: i64 = redis::cmd("XACK")
            .arg(&self.config.topic)
            .arg(&self.config.consumer_group)
            .arg(entry_id)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn fill_buffer(&mut self) -> Result<usize, StreamError> {
        let entries = match &self.mode {
            ReadMode::Pending(after) => {
                let entries = self.read(after, None).await?;
                match entries.last() {
                    Some(last) => {
                        self.mode = ReadMode::Pending(last.id.clone());
                        debug!(count = entries.len(), "Replaying pending entries");
                    }
                    None => {
                        debug!("Pending backlog drained, reading new entries");
                        self.mode = ReadMode::New;
                    }
                }
                entries
            }
            ReadMode::New => self.read(">", self.config.block_ms).await?,
        };

        let (messages, unusable) = decode_entries(entries);
        let queued = messages.len();
        self.buffer.extend(messages);
        for entry_id in unusable {
            self.discard(&entry_id).await;
        }
        Ok(queued)
    }
}

/// Split a batch into deliverable messages and the ids of entries without a payload
fn decode_entries(entries: Vec<StreamId>) -> (Vec<StreamMessage>, Vec<String>) {
    let mut messages = Vec::with_capacity(entries.len());
    let mut unusable = Vec::new();
    for entry in entries {
        match entry.get::<Vec<u8>>(VALUE_FIELD) {
            Some(payload) => {
                let mut message = StreamMessage::new(MessageId::Entry(entry.id.clone()), payload);
                message.key = entry.get::<String>(KEY_FIELD);
                messages.push(message);
            }
            None => unusable.push(entry.id),
        }
    }
    (messages, unusable)
}

#[async_trait]
impl MessageSource for RedisStreamSource {
    async fn fetch(&mut self) -> Result<StreamMessage, StreamError> {
        loop {
            if let Some(message) = self.buffer.pop_front() {
                return Ok(message);
            }

            let pending_replay = matches!(self.mode, ReadMode::Pending(_));
            let queued = match self.fill_buffer().await {
                Err(e) if e.is_nogroup_error() => {
                    warn!(stream = %self.config.topic, "Consumer group missing, recreating");
                    self.ensure_consumer_group().await?;
                    0
                }
                other => other?,
            };

            // polling mode, nothing new
            if queued == 0 && !pending_replay && self.config.block_ms.is_none() {
                tokio::time::sleep(self.config.poll_interval()).await;
            }
        }
    }

    async fn commit(&mut self, message: &StreamMessage) -> Result<(), StreamError> {
        match &message.id {
            MessageId::Entry(entry_id) => {
                self.ack(entry_id).await?;
                debug!(entry_id = %entry_id, "Acknowledged entry");
                Ok(())
            }
            MessageId::Offset(offset) => Err(StreamError::Internal(format!(
                "cannot acknowledge offset {} on a Redis stream",
                offset
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        if self.redis.take().is_some() {
            let dropped = self.buffer.len();
            self.buffer.clear();
            info!(
                stream = %self.config.topic,
                unacknowledged_buffered = dropped,
                "Closed stream connection"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::Value;

    fn entry(id: &str, fields: &[(&str, &str)]) -> StreamId {
        StreamId {
            id: id.to_string(),
            map: fields
                .iter()
                .map(|(field, value)| (field.to_string(), Value::BulkString(value.as_bytes().to_vec())))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_entries_without_value_do_not_drop_the_rest_of_the_batch() {
        let (messages, unusable) = decode_entries(vec![
            entry("1-0", &[("value", "first")]),
            entry("2-0", &[("key", "user-1")]),
            entry("3-0", &[("key", "user-2"), ("value", "third")]),
        ]);

        assert_eq!(unusable, vec!["2-0".to_string()]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, MessageId::Entry("1-0".into()));
        assert_eq!(messages[0].key, None);
        assert_eq!(messages[1].payload, b"third");
        assert_eq!(messages[1].key.as_deref(), Some("user-2"));
    }
}
