//! PostgreSQL database connection and configuration.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, instrument};

use karscan_core::error::{StorageError, StorageResult};

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Connection acquisition timeout.
    pub acquire_timeout: Duration,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Maximum connection lifetime.
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/karscan".to_string(),
            max_connections: 20,
            min_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DatabaseConfig {
    /// Create a configuration optimized for the indexer.
    pub fn for_indexer(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 10,
            min_connections: 3,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database with the given configuration.
    #[instrument(skip_all)]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        debug!(
            max_conn = config.max_connections,
            min_conn = config.min_connections,
            "Creating connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        debug!("Connection pool created");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StorageResult<()> {
        debug!("Running migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationError(e.to_string()))?;

        debug!("Migrations completed");

        Ok(())
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Purge all indexed data from the database.
    ///
    /// Truncates every record table and preserves the schema and the
    /// migrations tracking. Use this to re-index from scratch without
    /// dropping the database.
    #[instrument(skip(self))]
    pub async fn purge(&self) -> StorageResult<PurgeStats> {
        debug!("Starting database purge");

        // Count rows before purge for reporting
        let stats = PurgeStats {
            accounts_removed: self.count_rows("accounts").await?,
            transfers_removed: self.count_rows("transfers").await?,
            events_removed: self.count_rows("events").await?,
            extrinsics_removed: self.count_rows("extrinsics").await?,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        // Referencing tables go with accounts in the same statement
        sqlx::query("TRUNCATE transfers, extrinsics, events, accounts")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        debug!("Database purge completed");

        Ok(stats)
    }

    async fn count_rows(&self, table: &'static str) -> StorageResult<u64> {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(count.0 as u64)
    }
}

/// Statistics from a database purge operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub accounts_removed: u64,
    pub transfers_removed: u64,
    pub events_removed: u64,
    pub extrinsics_removed: u64,
}

impl PurgeStats {
    /// Total number of rows removed.
    pub fn total(&self) -> u64 {
        self.accounts_removed + self.transfers_removed + self.events_removed + self.extrinsics_removed
    }
}
