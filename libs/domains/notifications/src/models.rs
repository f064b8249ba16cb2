use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::{NotificationError, NotificationResult};

/// Notification kinds. Only `EmailVerification` is produced today.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    #[sea_orm(string_value = "email_verification")]
    EmailVerification,
    #[sea_orm(string_value = "order_created")]
    OrderCreated,
    #[sea_orm(string_value = "order_status_change")]
    OrderStatusChange,
    #[sea_orm(string_value = "new_message")]
    NewMessage,
    #[sea_orm(string_value = "review_created")]
    ReviewCreated,
    #[sea_orm(string_value = "new_review")]
    NewReview,
}

impl NotificationType {
    /// Email subject for this kind, if it is delivered by email
    pub fn email_subject(&self) -> Option<&'static str> {
        match self {
            NotificationType::EmailVerification => {
                Some("Подтверждение регистрации в АвиGo Маркетплейс")
            }
            _ => None,
        }
    }
}

/// Delivery status.
///
/// `Pending` → `Sent` | `Failed`. Terminal states never change; rewriting the
/// same status is allowed so a redelivered event can finish idempotently.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl NotificationStatus {
    pub fn can_transition_to(&self, next: NotificationStatus) -> bool {
        use NotificationStatus::*;
        matches!(
            (self, next),
            (Pending, Pending) | (Pending, Sent) | (Pending, Failed) | (Sent, Sent) | (Failed, Failed)
        )
    }

    /// Statuses a record may hold for a write of `self` to be accepted
    pub fn allowed_predecessors(&self) -> Vec<NotificationStatus> {
        use sea_orm::Iterable;
        Self::iter().filter(|from| from.can_transition_to(*self)).collect()
    }
}

/// Declared for the data model; only email is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryChannel {
    Email,
    Push,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailVerificationMetadata {
    pub confirmation_code: String,
    pub email: String,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

/// Type-specific fields of a notification.
///
/// Stored as a JSON object; the row's type decides which variant it is read back as.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationMetadata {
    EmailVerification(EmailVerificationMetadata),
    /// Kinds without a typed payload yet
    Other(Map<String, Value>),
}

impl NotificationMetadata {
    pub fn to_json(&self) -> NotificationResult<Value> {
        match self {
            NotificationMetadata::EmailVerification(meta) => Ok(serde_json::to_value(meta)?),
            NotificationMetadata::Other(map) => Ok(Value::Object(map.clone())),
        }
    }

    pub fn from_json(kind: NotificationType, value: Value) -> NotificationResult<Self> {
        match kind {
            NotificationType::EmailVerification => Ok(NotificationMetadata::EmailVerification(
                serde_json::from_value(value)?,
            )),
            _ => match value {
                Value::Object(map) => Ok(NotificationMetadata::Other(map)),
                Value::Null => Ok(NotificationMetadata::Other(Map::new())),
                other => Err(NotificationError::Internal(format!(
                    "metadata for {} must be a JSON object, got {}",
                    kind, other
                ))),
            },
        }
    }
}

/// Durable record of a delivery attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: NotificationMetadata,
    pub status: NotificationStatus,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// Pending verification-code notification for `request`
    pub fn email_verification(request: &SendEmailNotificationRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: request.user_id,
            kind: NotificationType::EmailVerification,
            title: "Подтверждение регистрации".to_string(),
            message: format!("Ваш код подтверждения: {}", request.confirmation_code),
            metadata: NotificationMetadata::EmailVerification(EmailVerificationMetadata {
                confirmation_code: request.confirmation_code.clone(),
                email: request.email.clone(),
                display_name: request.display_name.clone(),
                expires_at: request.expires_at,
            }),
            status: NotificationStatus::Pending,
            read_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    pub fn mark_sent(&mut self) -> NotificationResult<()> {
        self.transition(NotificationStatus::Sent)
    }

    pub fn mark_failed(&mut self) -> NotificationResult<()> {
        self.transition(NotificationStatus::Failed)
    }

    fn transition(&mut self, to: NotificationStatus) -> NotificationResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(NotificationError::InvalidStatusTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Ephemeral outgoing email
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendEmailNotificationRequest {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub confirmation_code: String,
    pub expires_at: DateTime<Utc>,
}

impl SendEmailNotificationRequest {
    /// Checks are ordered: user id, email, code, expiry (strictly after `now`)
    pub fn validate(&self, now: DateTime<Utc>) -> NotificationResult<()> {
        if self.user_id.is_nil() {
            return Err(NotificationError::InvalidUserId);
        }
        if self.email.trim().is_empty() {
            return Err(NotificationError::MissingEmail);
        }
        if self.confirmation_code.trim().is_empty() {
            return Err(NotificationError::MissingConfirmationCode);
        }
        if self.expires_at <= now {
            return Err(NotificationError::ExpiredCode);
        }
        Ok(())
    }
}

/// Outcome of a send. Success means `error` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SendEmailNotificationResponse {
    pub notification_id: Option<Uuid>,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<NotificationError>,
}

impl SendEmailNotificationResponse {
    pub fn sent(notification_id: Uuid, sent_at: DateTime<Utc>) -> Self {
        Self {
            notification_id: Some(notification_id),
            status: NotificationStatus::Sent,
            sent_at: Some(sent_at),
            error: None,
        }
    }

    pub fn failed(notification_id: Option<Uuid>, error: NotificationError) -> Self {
        Self {
            notification_id,
            status: NotificationStatus::Failed,
            sent_at: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
