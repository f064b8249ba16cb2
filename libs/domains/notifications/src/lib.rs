//! Notifications Domain
//!
//! Turns user-lifecycle events into delivered emails with a durable record
//! of every attempt.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  EventConsumer  │  ← stream-worker loop, commits on Ok
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ EventDispatcher │  ← envelope decode, route on event_type
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐      ┌──────────────────────────┐
//! │ NotificationSvc │ ───▶ │ NotificationRepository   │  create / update status
//! └────────┬────────┘      └──────────────────────────┘
//!          │
//! ┌────────▼────────┐
//! │ TemplateRenderer│  ← Handlebars, templates/email/*.html
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │  EmailTransport │  ← SMTP (lettre)
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let service = NotificationService::new(
//!     Arc::new(PgNotificationRepository::new(db)),
//!     Arc::new(HandlebarsRenderer::from_directory(&email.templates_path)?),
//!     Arc::new(SmtpTransport::new(&email)?),
//! );
//! let dispatcher = EventDispatcher::new(Arc::new(service));
//! ```

pub mod config;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod events;
pub mod models;
pub mod postgres;
pub mod providers;
pub mod repository;
pub mod service;
pub mod templates;

pub use config::{EmailConfig, EmailProviderKind};
pub use dispatcher::EventDispatcher;
pub use error::{NotificationError, NotificationResult};
pub use events::{EmailVerificationRequestedEvent, EventEnvelope, EventType};
pub use models::{
    DeliveryChannel, EmailMessage, EmailVerificationMetadata, Notification, NotificationMetadata,
    NotificationStatus, NotificationType, SendEmailNotificationRequest,
    SendEmailNotificationResponse,
};
pub use postgres::PgNotificationRepository;
pub use providers::{EmailTransport, SmtpTransport};
pub use repository::{InMemoryNotificationRepository, NotificationRepository};
pub use service::{NotificationOrchestrator, NotificationService, REGISTRATION_TEMPLATE};
pub use templates::{HandlebarsRenderer, TemplateData, TemplateRenderer};
