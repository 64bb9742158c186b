//! In-memory record store.
//!
//! Used when no database is configured and by integration tests. Nothing
//! survives the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use karscan_core::error::StorageResult;
use karscan_core::models::{EntityKind, Record};
use karscan_core::ports::RecordStore;

/// [`RecordStore`] over a map guarded by a [`RwLock`].
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(EntityKind, String), Record>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records actually inserted.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of records of one kind.
    pub async fn count(&self, kind: EntityKind) -> usize {
        self.records
            .read()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// All records of one kind, sorted by key.
    pub async fn records(&self, kind: EntityKind) -> Vec<Record> {
        let guard = self.records.read().await;
        let mut records: Vec<_> = guard
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, key), record)| (key.clone(), record.clone()))
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records.into_iter().map(|(_, record)| record).collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, kind: EntityKind, key: &str) -> StorageResult<Option<Record>> {
        Ok(self
            .records
            .read()
            .await
            .get(&(kind, key.to_string()))
            .cloned())
    }

    async fn save(&self, record: &Record) -> StorageResult<()> {
        let mut guard = self.records.write().await;
        let key = (record.kind(), record.key());
        if !guard.contains_key(&key) {
            guard.insert(key, record.clone());
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
