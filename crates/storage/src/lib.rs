//! Storage layer for the karscan indexer.
//!
//! This crate provides the implementations of the `RecordStore` port
//! defined in `karscan-core`:
//!
//! - [`postgres::PgRecordStore`] - PostgreSQL, with pooling and migrations
//! - [`memory::MemoryStore`] - process-local map for tests and dry runs
//!
//! # Usage
//!
//! ```ignore
//! use karscan_storage::{Database, DatabaseConfig, PgRecordStore};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_indexer(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(&db));
//! ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{Database, DatabaseConfig, PgRecordStore, PurgeStats};
