//! Connection pool construction from [`vigil_core::config::DatabaseConfig`].

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use vigil_core::config::DatabaseConfig;

use crate::error::StorageError;

/// Build a `PgPool` from the application's database configuration and run
/// pending migrations against it.
///
/// # Errors
///
/// Returns [`StorageError::Connection`] if the pool cannot be established,
/// or [`StorageError::Migration`] if migrations fail to apply.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Some(Duration::from_secs(config.max_lifetime_secs)))
        .max_lifetime(Some(Duration::from_secs(config.max_lifetime_secs)))
        .connect(&config.url)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "connected to postgres and applied migrations"
    );

    Ok(pool)
}
