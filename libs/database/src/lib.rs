//! Connectors for the notification worker's backing stores.
//!
//! - `postgres` (default): SeaORM connection pool for notification records,
//!   pool sizing from the environment, migration runner.
//! - `redis` (default): `ConnectionManager` used by the stream broker.
//! - `config`: `core_config::FromEnv` for [`postgres::PostgresConfig`].
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use database::common::RetryConfig;
//!
//! let db = postgres::connect_from_config_with_retry(config, Some(RetryConfig::startup())).await?;
//! postgres::run_migrations::<Migrator>(&db, "notification-worker").await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult};
