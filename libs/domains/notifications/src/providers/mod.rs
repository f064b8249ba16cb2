//! Mail transports.

mod smtp;

pub use smtp::SmtpTransport;

use crate::error::NotificationResult;
use crate::models::EmailMessage;
use async_trait::async_trait;

/// Delivers a rendered email.
///
/// Failures are `NotificationError::Provider` tagged with the recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> NotificationResult<()>;

    /// Name used in logs
    fn name(&self) -> &'static str {
        "smtp"
    }
}
