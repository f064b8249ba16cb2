//! Inbound user-lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Event-type tags this service recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum EventType {
    #[strum(serialize = "user.email.verification.requested")]
    EmailVerificationRequested,
    #[strum(serialize = "user.notification.chat.message")]
    ChatMessage,
    #[strum(serialize = "user.notification.listing.update")]
    ListingUpdate,
    #[strum(serialize = "user.notification.review.received")]
    ReviewReceived,
}

impl EventType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

/// Fields common to every event; decoded first to route on `event_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub event_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Missing and `null` both decode as an empty string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailVerificationRequestedEvent {
    pub event_type: String,
    pub user_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub confirmation_code: String,
    pub expires_at: DateTime<Utc>,
}

impl EmailVerificationRequestedEvent {
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
        confirmation_code: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: EventType::EmailVerificationRequested.to_string(),
            user_id: user_id.into(),
            timestamp: Some(Utc::now()),
            email: email.into(),
            display_name: display_name.into(),
            confirmation_code: confirmation_code.into(),
            expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_tags() {
        assert_eq!(
            EventType::from_tag("user.email.verification.requested"),
            Some(EventType::EmailVerificationRequested)
        );
        assert_eq!(EventType::ReviewReceived.as_str(), "user.notification.review.received");
        assert_eq!(EventType::from_tag("user.deleted"), None);
    }

    #[test]
    fn test_decode_verification_event() {
        let raw = json!({
            "event_type": "user.email.verification.requested",
            "user_id": "0190f4b4-0000-7000-8000-000000000001",
            "timestamp": "2026-10-19T10:00:00Z",
            "email": "a@b.com",
            "display_name": "Анна",
            "confirmation_code": "123456",
            "expires_at": "2026-10-19T10:15:00Z"
        });

        let envelope: EventEnvelope = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(envelope.event_type, "user.email.verification.requested");
        assert!(envelope.timestamp.is_some());

        let event: EmailVerificationRequestedEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.confirmation_code, "123456");
        assert_eq!((event.expires_at - event.timestamp.unwrap()).num_minutes(), 15);
    }

    #[test]
    fn test_envelope_tolerates_missing_optional_fields() {
        let envelope: EventEnvelope =
            serde_json::from_str(r#"{"event_type":"user.notification.chat.message"}"#).unwrap();
        assert!(envelope.user_id.is_empty());
        assert!(envelope.timestamp.is_none());
    }

    #[test]
    fn test_envelope_without_event_type_decodes_as_empty() {
        for raw in [r#"{}"#, r#"{"event_type":null,"user_id":null}"#, r#"{"user_id":"u1"}"#] {
            let envelope: EventEnvelope = serde_json::from_str(raw).unwrap();
            assert!(envelope.event_type.is_empty(), "{}", raw);
        }
    }
}
