//! Publish a single event onto the broker topic, for local testing.
//!
//! ```text
//! BROKER_URL=redis://localhost:6379 BROKER_TOPIC=user-events \
//!   cargo run -p notification_worker --bin publish_test_event -- --email me@example.com
//! ```

use chrono::{Duration, Utc};
use clap::Parser;
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_notifications::{EmailVerificationRequestedEvent, EventEnvelope, EventType};
use eyre::{Result, WrapErr};
use stream_worker::{BrokerConfig, StreamProducer};
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "publish_test_event")]
#[command(about = "Publish a user event to the notification worker's topic")]
struct Cli {
    /// Recipient address
    #[arg(short, long)]
    email: String,

    #[arg(short, long, default_value = "Test User")]
    display_name: String,

    #[arg(short, long, default_value = "123456")]
    code: String,

    /// Minutes until the code expires; negative values produce an expired code
    #[arg(long, default_value_t = 15, allow_negative_numbers = true)]
    expires_in_minutes: i64,

    /// Defaults to a fresh UUID
    #[arg(short, long)]
    user_id: Option<String>,

    /// Publish a bare envelope with this event type instead of a verification request
    #[arg(long)]
    event_type: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();
    init_tracing(&Environment::from_env());

    let cli = Cli::parse();
    let broker = BrokerConfig::from_env().wrap_err("Failed to load broker configuration")?;
    let redis = database::redis::connect(&broker.url)
        .await
        .wrap_err("Failed to connect to Redis")?;
    let producer = StreamProducer::from_config(redis, &broker);

    let user_id = cli.user_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let id = match cli.event_type {
        Some(event_type) if EventType::from_tag(&event_type) != Some(EventType::EmailVerificationRequested) => {
            let envelope = EventEnvelope {
                event_type,
                user_id: user_id.clone(),
                timestamp: Some(Utc::now()),
            };
            producer.publish_json(Some(&user_id), &envelope).await?
        }
        _ => {
            let event = EmailVerificationRequestedEvent::new(
                user_id.clone(),
                cli.email,
                cli.display_name,
                cli.code,
                Utc::now() + Duration::minutes(cli.expires_in_minutes),
            );
            producer.publish_json(Some(&user_id), &event).await?
        }
    };

    info!(entry_id = %id, topic = %producer.topic(), user_id = %user_id, "Published event");
    Ok(())
}
