use crate::error::StreamError;
use crate::message::StreamMessage;
use async_trait::async_trait;

/// A single logical subscription to a topic.
///
/// `fetch` must be cancel-safe: the consumer loop races it against the
/// shutdown signal and drops it when shutdown wins. A dropped fetch must not
/// lose a message that has not been returned yet (it may be redelivered).
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message
    async fn fetch(&mut self) -> Result<StreamMessage, StreamError>;

    /// Durably record that `message` has been handled
    async fn commit(&mut self, message: &StreamMessage) -> Result<(), StreamError>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<(), StreamError>;
}
