//! Port trait for the record store.
//!
//! The pipeline only ever reads a record by key and creates records; it
//! never updates or deletes. Implementations live in the infrastructure
//! layer (e.g., `karscan-storage`).

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{EntityKind, Record};

/// Keyed record store with first-write-wins creation.
///
/// The pipeline assumes it is the only writer while it processes an item.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by entity kind and key.
    async fn get(&self, kind: EntityKind, key: &str) -> StorageResult<Option<Record>>;

    /// Create a record. Saving a key that already exists leaves the stored
    /// record untouched.
    async fn save(&self, record: &Record) -> StorageResult<()>;

    /// Whether a record with this key exists.
    async fn exists(&self, kind: EntityKind, key: &str) -> StorageResult<bool> {
        Ok(self.get(kind, key).await?.is_some())
    }
}
