use async_trait::async_trait;
use std::sync::Arc;
use stream_worker::{MessageHandler, StreamError, StreamMessage};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{EmailVerificationRequestedEvent, EventEnvelope, EventType};
use crate::models::SendEmailNotificationRequest;
use crate::service::NotificationOrchestrator;

/// Routes decoded events to the orchestrator.
///
/// Unknown and not-yet-handled event types succeed so they get committed.
pub struct EventDispatcher<O> {
    orchestrator: Arc<O>,
}

impl<O: NotificationOrchestrator> EventDispatcher<O> {
    pub fn new(orchestrator: Arc<O>) -> Self {
        Self { orchestrator }
    }

    async fn handle_email_verification(&self, message: &StreamMessage) -> Result<(), StreamError> {
        let event: EmailVerificationRequestedEvent = serde_json::from_slice(&message.payload)?;
        let user_id = Uuid::parse_str(&event.user_id)
            .map_err(|e| StreamError::decode(format!("invalid user_id {:?}: {}", event.user_id, e)))?;

        let request = SendEmailNotificationRequest {
            user_id,
            email: event.email,
            display_name: event.display_name,
            confirmation_code: event.confirmation_code,
            expires_at: event.expires_at,
        };

        let response = self.orchestrator.send_registration_email(request).await;
        match response.error {
            None => {
                debug!(
                    message_id = %message.id,
                    notification_id = ?response.notification_id,
                    "Handled email verification event"
                );
                Ok(())
            }
            Some(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl<O: NotificationOrchestrator + 'static> MessageHandler for EventDispatcher<O> {
    async fn handle(&self, message: &StreamMessage) -> Result<(), StreamError> {
        let envelope: EventEnvelope = serde_json::from_slice(&message.payload)?;

        match EventType::from_tag(&envelope.event_type) {
            Some(EventType::EmailVerificationRequested) => {
                self.handle_email_verification(message).await
            }
            Some(event_type) => {
                info!(message_id = %message.id, event_type = %event_type, "No handler for event type, skipping");
                Ok(())
            }
            None => {
                warn!(message_id = %message.id, event_type = %envelope.event_type, "Unknown event type, skipping");
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "notification-dispatcher"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotificationError;
    use crate::models::SendEmailNotificationResponse;
    use crate::service::MockNotificationOrchestrator;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use stream_worker::MessageId;

    fn message(value: serde_json::Value) -> StreamMessage {
        StreamMessage::new(MessageId::Offset(0), value.to_string())
    }

    fn verification(user_id: &str) -> serde_json::Value {
        json!({
            "event_type": "user.email.verification.requested",
            "user_id": user_id,
            "timestamp": Utc::now(),
            "email": "a@b.com",
            "display_name": "Анна",
            "confirmation_code": "123456",
            "expires_at": Utc::now() + Duration::minutes(15),
        })
    }

    #[tokio::test]
    async fn test_routes_verification_event() {
        let user_id = Uuid::new_v4();
        let mut orchestrator = MockNotificationOrchestrator::new();
        orchestrator
            .expect_send_registration_email()
            .times(1)
            .withf(move |r| r.user_id == user_id && r.email == "a@b.com" && r.confirmation_code == "123456")
            .returning(|_| SendEmailNotificationResponse::sent(Uuid::new_v4(), Utc::now()));

        let dispatcher = EventDispatcher::new(Arc::new(orchestrator));
        let result = dispatcher.handle(&message(verification(&user_id.to_string()))).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failed_response_is_processing_error() {
        let mut orchestrator = MockNotificationOrchestrator::new();
        orchestrator
            .expect_send_registration_email()
            .returning(|_| SendEmailNotificationResponse::failed(None, NotificationError::ExpiredCode));

        let dispatcher = EventDispatcher::new(Arc::new(orchestrator));
        let err = dispatcher
            .handle(&message(verification(&Uuid::new_v4().to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Processing(ref m) if m.contains("expired")));
    }

    #[tokio::test]
    async fn test_unknown_and_unhandled_types_succeed() {
        let dispatcher = EventDispatcher::new(Arc::new(MockNotificationOrchestrator::new()));

        for event_type in ["user.notification.chat.message", "user.deleted"] {
            let result = dispatcher
                .handle(&message(json!({"event_type": event_type, "user_id": "not-a-uuid"})))
                .await;
            assert!(result.is_ok(), "{} should be absorbed", event_type);
        }
    }

    #[tokio::test]
    async fn test_missing_or_null_event_type_is_absorbed() {
        let dispatcher = EventDispatcher::new(Arc::new(MockNotificationOrchestrator::new()));

        for value in [
            json!({}),
            json!({"event_type": null, "user_id": "u1"}),
            json!({"user_id": "u1"}),
        ] {
            let result = dispatcher.handle(&message(value.clone())).await;
            assert!(result.is_ok(), "{} should be absorbed", value);
        }

        // Not an object at all is still a decode failure
        let scalar = message(json!("user.deleted"));
        assert!(matches!(dispatcher.handle(&scalar).await, Err(StreamError::Decode(_))));
    }

    #[tokio::test]
    async fn test_decode_failures() {
        let dispatcher = EventDispatcher::new(Arc::new(MockNotificationOrchestrator::new()));

        let garbage = StreamMessage::new(MessageId::Offset(0), "{not json");
        assert!(matches!(dispatcher.handle(&garbage).await, Err(StreamError::Decode(_))));

        let bad_user = message(verification("user-42"));
        assert!(matches!(dispatcher.handle(&bad_user).await, Err(StreamError::Decode(_))));

        let missing_expiry = message(json!({
            "event_type": "user.email.verification.requested",
            "user_id": Uuid::new_v4(),
        }));
        assert!(matches!(dispatcher.handle(&missing_expiry).await, Err(StreamError::Decode(_))));
    }
}
