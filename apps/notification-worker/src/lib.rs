//! Notification Worker Service
//!
//! ```text
//! Redis Stream (BROKER_TOPIC)
//!   ↓ (consumer group: notification-service)
//! EventConsumer<RedisStreamSource, EventDispatcher>
//!   ↓
//! NotificationService ──▶ PostgreSQL (notifications)
//!   ↓
//! Handlebars template ──▶ SMTP
//! ```
//!
//! One message is processed at a time and acknowledged only after it was
//! handled. `GET /health` runs alongside on `HOST:PORT`.

pub mod config;

use axum::Router;
use core_config::FromEnv;
use database::common::RetryConfig;
use database::postgres::{self, DatabaseConnection};
use domain_notifications::{
    EventDispatcher, HandlebarsRenderer, NotificationService, PgNotificationRepository,
    SmtpTransport,
};
use eyre::{Result, WrapErr};
use migration::Migrator;
use std::sync::Arc;
use std::time::Duration;
use stream_worker::{ConsumerConfig, EventConsumer, RedisStreamSource, health_router, shutdown_requested};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub use config::AppConfig;

pub const SERVICE_NAME: &str = "notification-service";

/// How long the health listener may take to drain after shutdown starts
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Load configuration from the environment and run until SIGINT/SIGTERM
pub async fn run() -> Result<()> {
    let environment = core_config::Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let config = AppConfig::from_env().wrap_err("Failed to load configuration")?;
    info!(
        service = SERVICE_NAME,
        environment = ?config.environment,
        topic = %config.broker.topic,
        consumer_group = %config.broker.consumer_group,
        consumer = %config.broker.consumer_name,
        "Starting notification worker"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    run_with_config(config, shutdown_rx).await
}

/// Wire every component from `config` and run until `shutdown` flips to true
pub async fn run_with_config(config: AppConfig, shutdown: watch::Receiver<bool>) -> Result<()> {
    let db = postgres::connect_from_config_with_retry(config.database.clone(), Some(RetryConfig::startup()))
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;
    postgres::run_migrations::<Migrator>(&db, SERVICE_NAME)
        .await
        .wrap_err("Failed to run migrations")?;

    let redis = database::redis::connect_with_retry(&config.broker.url, Some(RetryConfig::startup()))
        .await
        .wrap_err("Failed to connect to Redis")?;
    let source = RedisStreamSource::connect(redis, config.broker.clone())
        .await
        .wrap_err("Failed to join consumer group")?;

    let renderer = HandlebarsRenderer::from_directory(&config.email.templates_path)
        .wrap_err_with(|| format!("Failed to load templates from {}", config.email.templates_path.display()))?;
    let transport = SmtpTransport::new(&config.email).wrap_err("Failed to configure SMTP transport")?;
    info!(provider = %config.email.provider, host = %config.email.smtp_host, "Email transport ready");

    let service = NotificationService::new(
        Arc::new(PgNotificationRepository::new(db.clone())),
        Arc::new(renderer),
        Arc::new(transport),
    );
    let dispatcher = Arc::new(EventDispatcher::new(Arc::new(service)));

    let listener = TcpListener::bind(config.server.address())
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", config.server.address()))?;
    info!(address = %config.server.address(), "Health server listening");
    let server = tokio::spawn(serve_health(listener, health_router(SERVICE_NAME), shutdown.clone()));

    let consumer = EventConsumer::new(source, dispatcher, ConsumerConfig::default());
    let consumed = consumer.start(shutdown.clone()).await;
    if let Err(e) = &consumed {
        error!(error = %e, "Event consumer stopped with an error");
    }

    stop_health_server(server, shutdown).await;
    close_database(db).await;

    info!("Notification worker stopped");
    consumed.wrap_err("Event consumer failed")
}

async fn serve_health(listener: TcpListener, app: Router, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_requested(&mut shutdown).await })
        .await
        .wrap_err("Health server failed")
}

/// Waits for the listener to drain, at most `SHUTDOWN_GRACE` after shutdown starts.
/// If the consumer exited on its own the listener is aborted.
async fn stop_health_server(server: tokio::task::JoinHandle<Result<()>>, shutdown: watch::Receiver<bool>) {
    if !*shutdown.borrow() {
        warn!("Consumer exited before shutdown was requested, stopping health server");
        server.abort();
        return;
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Ok(()))) => info!("Health server stopped"),
        Ok(Ok(Err(e))) => error!(error = %e, "Health server failed"),
        Ok(Err(e)) => error!(error = %e, "Health server task panicked"),
        Err(_) => warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Health server did not drain in time"),
    }
}

async fn close_database(db: DatabaseConnection) {
    if let Err(e) = postgres::close(db).await {
        warn!(error = %e, "Failed to close PostgreSQL pool");
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating shutdown..."),
    }
}
