//! # Radman Database
//!
//! Connection pooling and queries against the FreeRADIUS SQL tables
//! (`users`, `radusergroup`, `radcheck`).

use std::time::Duration;

use anyhow::{Context, Result};
use radman_config::DbConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};

pub mod radius;

/// Database connection pool type
pub type DbPool = Pool<Postgres>;

/// Embedded schema migrations (`migrations/` at the workspace root)
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Build connection options from discrete settings so that passwords with
/// URL-reserved characters need no escaping.
pub fn connect_options(config: &DbConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.name)
}

/// Create a PostgreSQL connection pool and verify it with a ping
pub async fn create_pool(config: &DbConfig) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
        .test_before_acquire(true)
        .connect_with(connect_options(config))
        .await
        .with_context(|| format!("Failed to connect to database {}", config.describe()))?;

    ping(&pool)
        .await
        .with_context(|| format!("Database {} did not answer ping", config.describe()))?;

    tracing::info!(database = %config.describe(), "Connected to database");
    Ok(pool)
}

/// Round-trip a trivial query to confirm the database is reachable
pub async fn ping(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending schema migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}

/// Whether the error is a unique or primary key violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
