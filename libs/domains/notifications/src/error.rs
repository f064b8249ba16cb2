//! Error types for the notifications domain.

use crate::models::NotificationStatus;
use thiserror::Error;
use uuid::Uuid;

pub type NotificationResult<T> = Result<T, NotificationError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotificationError {
    #[error("invalid user id")]
    InvalidUserId,

    #[error("email is required")]
    MissingEmail,

    #[error("confirmation code is required")]
    MissingConfirmationCode,

    #[error("confirmation code has expired")]
    ExpiredCode,

    #[error("invalid notification id")]
    InvalidNotificationId,

    /// Unknown id, or (for mark-as-read) already read
    #[error("notification not found: {0}")]
    NotFound(Uuid),

    #[error("cannot change notification status from {from} to {to}")]
    InvalidStatusTransition {
        from: NotificationStatus,
        to: NotificationStatus,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Template error: {0}")]
    Template(String),

    /// Mail transport failure, tagged with the recipient address
    #[error("failed to send email to {to}: {reason}")]
    Provider { to: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    /// Prefix a storage failure with the operation that hit it
    pub fn storage_context(self, operation: &str) -> Self {
        match self {
            NotificationError::Database(reason) => {
                NotificationError::Database(format!("failed to {}: {}", operation, reason))
            }
            other => other,
        }
    }

    pub fn provider(to: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        NotificationError::Provider {
            to: to.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<sea_orm::DbErr> for NotificationError {
    fn from(err: sea_orm::DbErr) -> Self {
        NotificationError::Database(err.to_string())
    }
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::Template(err.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        NotificationError::Config(err.to_string())
    }
}

impl From<NotificationError> for stream_worker::StreamError {
    fn from(err: NotificationError) -> Self {
        stream_worker::StreamError::Processing(err.to_string())
    }
}
