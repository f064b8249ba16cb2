//! Registration email workflow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::NotificationError;
use crate::models::{
    EmailMessage, Notification, SendEmailNotificationRequest, SendEmailNotificationResponse,
};
use crate::providers::EmailTransport;
use crate::repository::NotificationRepository;
use crate::templates::{TemplateData, TemplateRenderer};

pub const REGISTRATION_TEMPLATE: &str = "registration";

/// Entry point used by the event dispatcher.
///
/// Never returns an `Err`: failures are carried in the response so the
/// caller still learns the id of a record that was created.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationOrchestrator: Send + Sync {
    async fn send_registration_email(
        &self,
        request: SendEmailNotificationRequest,
    ) -> SendEmailNotificationResponse;
}

pub struct NotificationService<R, T, E> {
    repository: Arc<R>,
    renderer: Arc<T>,
    transport: Arc<E>,
}

impl<R, T, E> Clone for NotificationService<R, T, E> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            renderer: Arc::clone(&self.renderer),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<R, T, E> NotificationService<R, T, E>
where
    R: NotificationRepository,
    T: TemplateRenderer,
    E: EmailTransport,
{
    pub fn new(repository: Arc<R>, renderer: Arc<T>, transport: Arc<E>) -> Self {
        Self {
            repository,
            renderer,
            transport,
        }
    }

    /// Best-effort: the record keeps whatever status it had if this fails
    async fn finish(&self, notification: &mut Notification, sent: bool) {
        let transition = if sent {
            notification.mark_sent()
        } else {
            notification.mark_failed()
        };

        let result = match transition {
            Ok(()) => self.repository.update(notification).await.map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!(
                notification_id = %notification.id,
                status = %notification.status,
                error = %e,
                "Failed to record notification status"
            );
        }
    }

    async fn fail(
        &self,
        mut notification: Notification,
        error: NotificationError,
    ) -> SendEmailNotificationResponse {
        warn!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            error = %error,
            "Registration email failed"
        );
        self.finish(&mut notification, false).await;
        SendEmailNotificationResponse::failed(Some(notification.id), error)
    }
}

/// Whole minutes until `expires_at`, e.g. "15 минут"
pub fn expires_in(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (expires_at - now).num_milliseconds() as f64 / 60_000.0;
    format!("{:.0} минут", minutes)
}

#[async_trait]
impl<R, T, E> NotificationOrchestrator for NotificationService<R, T, E>
where
    R: NotificationRepository,
    T: TemplateRenderer,
    E: EmailTransport,
{
    async fn send_registration_email(
        &self,
        request: SendEmailNotificationRequest,
    ) -> SendEmailNotificationResponse {
        let now = Utc::now();

        if let Err(e) = request.validate(now) {
            debug!(user_id = %request.user_id, error = %e, "Rejected registration email request");
            return SendEmailNotificationResponse::failed(None, e);
        }

        let notification = match self
            .repository
            .create(Notification::email_verification(&request, now))
            .await
        {
            Ok(notification) => notification,
            Err(e) => {
                let e = e.storage_context("create notification");
                warn!(user_id = %request.user_id, error = %e, "Failed to store notification");
                return SendEmailNotificationResponse::failed(None, e);
            }
        };

        let data = TemplateData::from([
            ("DisplayName".to_string(), request.display_name.clone()),
            ("ConfirmationCode".to_string(), request.confirmation_code.clone()),
            ("ExpiresIn".to_string(), expires_in(request.expires_at, Utc::now())),
        ]);

        let html_body = match self.renderer.render(REGISTRATION_TEMPLATE, &data) {
            Ok(html) => html,
            Err(e) => return self.fail(notification, e).await,
        };

        let subject = notification.kind.email_subject().unwrap_or_default();
        let message = EmailMessage {
            to: request.email.clone(),
            subject: subject.to_string(),
            html_body,
            text_body: None,
        };

        if let Err(e) = self.transport.send(&message).await {
            return self.fail(notification, e).await;
        }

        let mut notification = notification;
        self.finish(&mut notification, true).await;

        let sent_at = Utc::now();
        info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            transport = self.transport.name(),
            "Registration email sent"
        );
        SendEmailNotificationResponse::sent(notification.id, sent_at)
    }
}
