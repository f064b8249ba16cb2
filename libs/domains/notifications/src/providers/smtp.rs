//! SMTP transport built on lettre.

use super::EmailTransport;
use crate::config::{EmailConfig, EmailProviderKind};
use crate::error::{NotificationError, NotificationResult};
use crate::models::EmailMessage;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{
        Mailbox, MultiPart,
        header::{ContentType, MIME_VERSION_1_0},
    },
    transport::smtp::authentication::Credentials,
};
use std::time::Duration;
use tracing::{debug, error};

const SEND_TIMEOUT: Duration = Duration::from_secs(20);
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
    port: u16,
}

impl SmtpTransport {
    pub fn new(config: &EmailConfig) -> NotificationResult<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_address)
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::Config(format!("Invalid from address: {}", e)))?;

        Ok(Self {
            transport: Self::build_transport(config)?,
            from,
            host: config.smtp_host.clone(),
            port: config.smtp_port,
        })
    }

    fn build_transport(config: &EmailConfig) -> NotificationResult<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = match config.provider {
            // Local relay: plain connection, no auth
            EmailProviderKind::Mailpit => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            }
            EmailProviderKind::Smtp => {
                let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
                    AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                }
                .map_err(|e| NotificationError::Config(format!("Failed to create SMTP relay: {}", e)))?;

                match (&config.smtp_username, &config.smtp_password) {
                    (Some(username), Some(password)) => {
                        builder.credentials(Credentials::new(username.clone(), password.clone()))
                    }
                    _ => builder,
                }
            }
        };

        Ok(builder
            .port(config.smtp_port)
            .timeout(Some(SEND_TIMEOUT))
            .build())
    }

    fn build_message(&self, email: &EmailMessage) -> NotificationResult<Message> {
        build_message(&self.from, email)
    }
}

pub(crate) fn build_message(from: &Mailbox, email: &EmailMessage) -> NotificationResult<Message> {
    if email.to.trim().is_empty() {
        return Err(NotificationError::provider("", "recipient address is empty"));
    }

    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| NotificationError::provider(&email.to, format!("invalid address: {}", e)))?;

    let builder = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(&email.subject);

    let message = match email.text_body.as_deref().filter(|text| !text.is_empty()) {
        Some(text) => builder.multipart(MultiPart::alternative_plain_html(
            text.to_string(),
            email.html_body.clone(),
        )),
        None => builder
            .header(MIME_VERSION_1_0)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone()),
    };

    message.map_err(|e| NotificationError::provider(&email.to, e))
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    async fn send(&self, email: &EmailMessage) -> NotificationResult<()> {
        debug!(
            to = %email.to,
            subject = %email.subject,
            host = %self.host,
            port = self.port,
            "Sending email via SMTP"
        );

        let message = self.build_message(email)?;

        self.transport.send(message).await.map_err(|e| {
            error!(to = %email.to, error = %e, "Failed to send email via SMTP");
            NotificationError::provider(&email.to, e)
        })?;

        debug!(to = %email.to, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn from() -> Mailbox {
        "Notification Service <noreply@example.com>".parse().unwrap()
    }

    fn email(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Welcome".to_string(),
            html_body: "<p>hi</p>".to_string(),
            text_body: None,
        }
    }

    fn mailpit(port: u16) -> EmailConfig {
        EmailConfig {
            provider: EmailProviderKind::Mailpit,
            smtp_host: "127.0.0.1".to_string(),
            smtp_port: port,
            smtp_username: None,
            smtp_password: None,
            from_name: "Notification Service".to_string(),
            from_address: "noreply@example.com".to_string(),
            templates_path: PathBuf::from("templates/email"),
        }
    }

    #[test]
    fn test_build_html_message() {
        let message = build_message(&from(), &email("a@b.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: a@b.com"));
        assert!(raw.contains("Subject: Welcome"));
        assert!(raw.contains("MIME-Version: 1.0"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
        assert!(raw.contains("<p>hi</p>"));
    }

    #[test]
    fn test_build_multipart_when_text_present() {
        let mut email = email("a@b.com");
        email.text_body = Some("hi".to_string());
        let raw = String::from_utf8(build_message(&from(), &email).unwrap().formatted()).unwrap();

        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert_eq!(raw.matches("MIME-Version: 1.0").count(), 1);
    }

    #[test]
    fn test_rejects_empty_or_invalid_recipient() {
        assert!(matches!(
            build_message(&from(), &email("  ")),
            Err(NotificationError::Provider { .. })
        ));
        assert!(matches!(
            build_message(&from(), &email("not an address")),
            Err(NotificationError::Provider { to, .. }) if to == "not an address"
        ));
    }

    #[test]
    fn test_invalid_from_address() {
        let mut config = mailpit(1025);
        config.from_address = "nope".to_string();
        assert!(matches!(
            SmtpTransport::new(&config),
            Err(NotificationError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_error_names_recipient() {
        // nothing listens on port 1
        let transport = SmtpTransport::new(&mailpit(1)).unwrap();
        let err = transport.send(&email("a@b.com")).await.unwrap_err();

        assert!(matches!(err, NotificationError::Provider { ref to, .. } if to == "a@b.com"));
        assert!(err.to_string().contains("a@b.com"));
    }
}
