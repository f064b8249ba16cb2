//! The fetch → handle → commit loop

use crate::config::ConsumerConfig;
use crate::error::StreamError;
use crate::handler::MessageHandler;
use crate::message::StreamMessage;
use crate::source::MessageSource;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Resolves once shutdown has been requested or the sender is gone
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

enum Outcome {
    Handled,
    Failed(StreamError),
    Cancelled,
}

/// Sequential consumer over one subscription.
///
/// One message is in flight at a time. A message is committed only after its
/// handler succeeds; a failed or timed-out message is logged and skipped
/// without a commit.
pub struct EventConsumer<S, H> {
    source: S,
    handler: Arc<H>,
    config: ConsumerConfig,
}

impl<S, H> EventConsumer<S, H>
where
    S: MessageSource,
    H: MessageHandler,
{
    pub fn new(source: S, handler: Arc<H>, config: ConsumerConfig) -> Self {
        Self {
            source,
            handler,
            config,
        }
    }

    /// Run until `shutdown` flips to `true`, then close the source.
    ///
    /// Returns the result of closing the source.
    pub async fn start(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            handler = self.handler.name(),
            process_timeout_secs = self.config.process_timeout.as_secs(),
            "Event consumer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let fetched = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                fetched = self.source.fetch() => fetched,
            };

            let message = match fetched {
                Ok(message) => message,
                Err(StreamError::Closed) => {
                    warn!("Message source closed underneath the consumer");
                    break;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_ms = self.config.fetch_retry_delay.as_millis() as u64,
                        "Failed to fetch message"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown_requested(&mut shutdown) => break,
                        _ = tokio::time::sleep(self.config.fetch_retry_delay) => continue,
                    }
                }
            };

            match self.process(&message, &mut shutdown).await {
                Outcome::Handled => {
                    if let Err(e) = self.source.commit(&message).await {
                        error!(message_id = %message.id, error = %e, "Failed to commit message");
                    } else {
                        debug!(message_id = %message.id, "Committed message");
                    }
                }
                Outcome::Failed(e) => {
                    error!(
                        message_id = %message.id,
                        handler = self.handler.name(),
                        error = %e,
                        "Message handling failed, leaving it uncommitted"
                    );
                }
                Outcome::Cancelled => {
                    info!(message_id = %message.id, "Shutdown interrupted message handling");
                    break;
                }
            }
        }

        info!("Event consumer stopping, closing source");
        self.source.close().await
    }

    async fn process(
        &self,
        message: &StreamMessage,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Outcome {
        let deadline = self.config.process_timeout;
        let handled = tokio::select! {
            biased;
            _ = shutdown_requested(shutdown) => return Outcome::Cancelled,
            handled = tokio::time::timeout(deadline, self.handler.handle(message)) => handled,
        };

        match handled {
            Ok(Ok(())) => Outcome::Handled,
            Ok(Err(e)) => Outcome::Failed(e),
            Err(_) => Outcome::Failed(StreamError::Timeout(deadline)),
        }
    }
}
