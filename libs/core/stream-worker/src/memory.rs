//! In-process offset log.
//!
//! Behaves like a single-partition log with per-group committed offsets: a
//! new subscription starts at the group's committed offset and committing a
//! message advances that offset past it. Used by tests and local runs.

use crate::error::StreamError;
use crate::message::{MessageId, StreamMessage};
use crate::source::MessageSource;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Default)]
struct LogState {
    records: Vec<(Option<String>, Vec<u8>)>,
    committed: HashMap<String, u64>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<LogState>,
    appended: Notify,
}

/// Append-only log shared between producers and subscriptions
#[derive(Clone, Default)]
pub struct MemoryLog {
    shared: Arc<Shared>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LogState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a record and return its offset
    pub fn publish(&self, key: Option<&str>, payload: impl Into<Vec<u8>>) -> u64 {
        let offset = {
            let mut state = self.state();
            state.records.push((key.map(str::to_string), payload.into()));
            (state.records.len() - 1) as u64
        };
        self.shared.appended.notify_waiters();
        offset
    }

    pub fn publish_json<T: Serialize>(&self, key: Option<&str>, value: &T) -> Result<u64, StreamError> {
        let payload = serde_json::to_vec(value)?;
        Ok(self.publish(key, payload))
    }

    /// Open a subscription for `group`, resuming at its committed offset
    pub fn subscribe(&self, group: impl Into<String>) -> MemorySource {
        let group = group.into();
        let position = self.committed_offset(&group);
        MemorySource {
            log: self.clone(),
            group,
            position,
            closed: false,
        }
    }

    /// Next offset `group` will resume from
    pub fn committed_offset(&self, group: &str) -> u64 {
        self.state().committed.get(group).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MemorySource {
    log: MemoryLog,
    group: String,
    position: u64,
    closed: bool,
}

impl MemorySource {
    pub fn position(&self) -> u64 {
        self.position
    }

    fn next_record(&mut self) -> Option<StreamMessage> {
        let state = self.log.state();
        let (key, payload) = state.records.get(self.position as usize)?.clone();
        let mut message = StreamMessage::new(MessageId::Offset(self.position), payload);
        message.key = key;
        drop(state);

        self.position += 1;
        Some(message)
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn fetch(&mut self) -> Result<StreamMessage, StreamError> {
        loop {
            if self.closed {
                return Err(StreamError::Closed);
            }

            let shared = self.log.shared.clone();
            let appended = shared.appended.notified();
            if let Some(message) = self.next_record() {
                return Ok(message);
            }
            appended.await;
        }
    }

    async fn commit(&mut self, message: &StreamMessage) -> Result<(), StreamError> {
        let &MessageId::Offset(offset) = &message.id else {
            return Err(StreamError::Internal(format!(
                "cannot commit entry {} on an offset log",
                message.id
            )));
        };

        let mut state = self.log.state();
        let committed = state.committed.entry(self.group.clone()).or_insert(0);
        *committed = (*committed).max(offset + 1);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.closed = true;
        Ok(())
    }
}
