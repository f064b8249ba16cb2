//! Stream error types
//!
//! The consumer loop does not distinguish transient from permanent failures:
//! any handler error leaves the message uncommitted.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Message payload could not be decoded or encoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Handler reported a failure
    #[error("Processing error: {0}")]
    Processing(String),

    /// Handler exceeded the per-message deadline
    #[error("Processing timed out after {0:?}")]
    Timeout(Duration),

    /// The source was closed and cannot deliver more messages
    #[error("Message source is closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StreamError {
    pub fn processing(message: impl Into<String>) -> Self {
        StreamError::Processing(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        StreamError::Decode(message.into())
    }

    /// Consumer group is missing (stream deleted or group destroyed)
    pub fn is_nogroup_error(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.to_string().contains("NOGROUP"))
    }

    pub fn is_connection_error(&self) -> bool {
        match self {
            StreamError::Redis(e) => {
                e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error()
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Decode(err.to_string())
    }
}
