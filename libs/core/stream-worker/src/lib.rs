//! Stream Worker
//!
//! Sequential, at-least-once consumption of a partitioned event log.
//!
//! ```text
//!   broker ──fetch──▶ EventConsumer ──handle──▶ MessageHandler
//!     ▲                    │
//!     └──────commit────────┘   (only when handle returned Ok)
//! ```
//!
//! - [`MessageSource`]: one subscription. [`RedisStreamSource`] (consumer
//!   groups, `XACK` as commit) for production, [`MemorySource`] over a
//!   [`MemoryLog`] for tests.
//! - [`MessageHandler`]: decodes and acts on a message.
//! - [`EventConsumer`]: the loop. Per-message deadline, fixed pause after a
//!   failed fetch, stops on a `watch` shutdown signal.
//! - [`StreamProducer`]: `XADD` publisher.
//! - [`health_router`]: `GET /health`.
//!
//! ```ignore
//! let source = RedisStreamSource::connect(redis, broker_config).await?;
//! let consumer = EventConsumer::new(source, Arc::new(dispatcher), ConsumerConfig::default());
//! consumer.start(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod error;
mod handler;
mod health;
mod memory;
mod message;
mod producer;
mod source;
mod worker;

pub use config::{BrokerConfig, ConsumerConfig};
pub use consumer::{KEY_FIELD, RedisStreamSource, VALUE_FIELD};
pub use error::StreamError;
pub use handler::MessageHandler;
pub use health::{HealthResponse, HealthState, health_handler, health_router};
pub use memory::{MemoryLog, MemorySource};
pub use message::{MessageId, StreamMessage};
pub use producer::StreamProducer;
pub use source::MessageSource;
pub use worker::{EventConsumer, shutdown_requested};
