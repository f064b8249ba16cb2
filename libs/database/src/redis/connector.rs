use ::redis::Client;
use ::redis::aio::ConnectionManager;
use tracing::info;

use crate::common::{RetryConfig, retry, retry_with_backoff};

/// Connect to Redis and verify the connection with `PING`.
///
/// The returned [`ConnectionManager`] reconnects on its own after a dropped
/// connection; callers see the failed command as an error.
pub async fn connect(url: &str) -> ::redis::RedisResult<ConnectionManager> {
    let client = Client::open(url)?;
    let mut manager = ConnectionManager::new(client).await?;

    let _: String = ::redis::cmd("PING").query_async(&mut manager).await?;

    info!("Connected to Redis");
    Ok(manager)
}

/// [`connect`], retried with backoff while Redis is unreachable
pub async fn connect_with_retry(
    url: &str,
    retry_config: Option<RetryConfig>,
) -> ::redis::RedisResult<ConnectionManager> {
    match retry_config {
        Some(policy) => retry_with_backoff(|| connect(url), policy).await,
        None => retry(|| connect(url)).await,
    }
}
