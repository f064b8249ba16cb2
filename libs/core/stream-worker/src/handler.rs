use crate::error::StreamError;
use crate::message::StreamMessage;
use async_trait::async_trait;

/// Handles one message at a time on behalf of [`crate::EventConsumer`].
///
/// Return `Ok(())` to have the message committed. Any error leaves it
/// uncommitted, so it is seen again after a restart.
///
/// ```rust,ignore
/// struct Printer;
///
/// #[async_trait]
/// impl MessageHandler for Printer {
///     async fn handle(&self, message: &StreamMessage) -> Result<(), StreamError> {
///         println!("{}", message.payload_lossy());
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "printer"
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &StreamMessage) -> Result<(), StreamError>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}
