//! In-memory store for unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::models::{EntityKind, Record};
use crate::ports::RecordStore;

#[derive(Default)]
pub struct TestStore {
    records: Mutex<BTreeMap<(EntityKind, String), Record>>,
    writes: AtomicUsize,
    /// Keys in the order they were first saved.
    order: Mutex<Vec<(EntityKind, String)>>,
    /// Number of upcoming `save` calls that fail with a connection error.
    pub failing_saves: AtomicUsize,
}

impl TestStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn save_order(&self) -> Vec<(EntityKind, String)> {
        self.order.lock().unwrap().clone()
    }

    /// Position of a key in the save order.
    pub fn saved_at(&self, kind: EntityKind, key: &str) -> Option<usize> {
        self.save_order()
            .iter()
            .position(|(k, id)| *k == kind && id == key)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.records
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub fn record(&self, kind: EntityKind, key: &str) -> Option<Record> {
        self.records
            .lock()
            .unwrap()
            .get(&(kind, key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl RecordStore for TestStore {
    async fn get(&self, kind: EntityKind, key: &str) -> StorageResult<Option<Record>> {
        Ok(self.record(kind, key))
    }

    async fn save(&self, record: &Record) -> StorageResult<()> {
        let pending = self.failing_saves.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_saves.store(pending - 1, Ordering::SeqCst);
            return Err(StorageError::ConnectionError("connection reset".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        let key = (record.kind(), record.key());
        let mut records = self.records.lock().unwrap();
        if !records.contains_key(&key) {
            self.order.lock().unwrap().push(key.clone());
            records.insert(key, record.clone());
        }
        Ok(())
    }
}
