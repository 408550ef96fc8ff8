//! Postgres persistence for the price catalog.
//!
//! Per-table query modules expose free functions over a [`PgPool`];
//! [`PgCatalogStore`] stitches them into the [`pricecat_core::CatalogStore`]
//! contract and translates [`DbError`] into the catalog error taxonomy.

use std::time::Duration;

use pricecat_core::{AppConfig, CatalogError};
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub mod articuls;
pub mod brands;
pub mod categories;
pub mod prices;
pub mod products;
mod store;
pub mod suppliers;
pub mod uploads;

pub use store::PgCatalogStore;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/pricecat-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    /// A stored value could not be mapped back to a domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Whether the failure is a violation of the named table constraint.
    #[must_use]
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, DbError::Sqlx(sqlx::Error::Database(db)) if db.constraint() == Some(constraint))
    }

    /// Classify into the catalog taxonomy. `entity` and `key` name the record
    /// the failed statement was about.
    #[must_use]
    pub fn into_catalog(self, entity: &'static str, key: &str) -> CatalogError {
        match self {
            DbError::NotFound | DbError::Sqlx(sqlx::Error::RowNotFound) => {
                CatalogError::not_found(entity, key)
            }
            DbError::Sqlx(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                CatalogError::duplicate(entity, key)
            }
            DbError::Sqlx(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                CatalogError::not_found(entity, format!("{key} ({})", db.message()))
            }
            DbError::Sqlx(
                e @ (sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::WorkerCrashed),
            ) => CatalogError::Unavailable(e.to_string()),
            other => CatalogError::Store(other.to_string()),
        }
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table may not exist yet on a fresh database; treat
    // absence as zero applied.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[test]
    fn pool_timeout_is_unavailable() {
        let err = DbError::Sqlx(sqlx::Error::PoolTimedOut).into_catalog("brand", "bosch");
        assert!(err.is_unavailable());
    }

    #[test]
    fn row_not_found_is_not_found() {
        let err = DbError::Sqlx(sqlx::Error::RowNotFound).into_catalog("product", "42");
        assert!(matches!(err, CatalogError::NotFound { entity: "product", .. }));
    }

    #[test]
    fn corrupt_row_is_a_store_error() {
        let err = DbError::Corrupt("status 'x'".into()).into_catalog("upload file", "a.csv");
        assert!(matches!(err, CatalogError::Store(_)));
    }
}
