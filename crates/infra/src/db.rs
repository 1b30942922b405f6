//! Connection pool bootstrap and schema setup.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use warung_core::StorageError;

use crate::config::DatabaseConfig;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

#[instrument(skip(config), fields(max_connections = config.max_connections), err)]
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| StorageError::new("connect", e.to_string()))?;

    tracing::info!("database pool ready");
    Ok(pool)
}

/// Create tables and indexes if they do not exist yet. Idempotent.
#[instrument(skip(pool), err)]
pub async fn apply_schema(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| StorageError::new("apply_schema", e.to_string()))?;
    Ok(())
}
