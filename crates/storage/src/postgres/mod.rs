//! PostgreSQL storage adapter.
//!
//! - [`Database`] - Connection pool, migrations and purge
//! - [`PgRecordStore`] - `RecordStore` over the `accounts`, `transfers`,
//!   `events` and `extrinsics` tables
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_indexer(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let store = PgRecordStore::new(&db);
//! ```

mod database;
mod helpers;
mod record_store;

pub use database::{Database, DatabaseConfig, PurgeStats};
pub use record_store::PgRecordStore;
