//! Get-or-create resolution of addresses to Account records.

use std::sync::Arc;

use tracing::trace;

use crate::error::StorageResult;
use crate::metrics::record_derived;
use crate::models::{Account, AccountId, EntityKind, Record};
use crate::ports::RecordStore;

/// Ensures every observed address has exactly one Account record.
#[derive(Clone)]
pub struct AccountRegistry {
    store: Arc<dyn RecordStore>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Resolve an address to the reference stored on other records.
    ///
    /// The address is its own key, so the returned reference is the
    /// address itself. Repeated calls write nothing after the first.
    pub async fn resolve(&self, address: &AccountId) -> StorageResult<AccountId> {
        self.ensure(address).await?;
        Ok(address.clone())
    }

    /// Create the Account if it does not exist yet.
    /// Returns `true` when a record was written.
    pub async fn ensure(&self, address: &AccountId) -> StorageResult<bool> {
        if self
            .store
            .exists(EntityKind::Account, address.as_str())
            .await?
        {
            return Ok(false);
        }

        let account = Record::Account(Account {
            id: address.clone(),
        });
        self.store.save(&account).await?;
        record_derived(EntityKind::Account);
        trace!(account = %address, "Account created");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestStore;

    #[tokio::test]
    async fn resolve_twice_writes_once() {
        let store = Arc::new(TestStore::default());
        let registry = AccountRegistry::new(store.clone());
        let alice = AccountId::new("Alice").unwrap();

        let first = registry.resolve(&alice).await.unwrap();
        let second = registry.resolve(&alice).await.unwrap();

        assert_eq!(first, alice);
        assert_eq!(second, alice);
        assert_eq!(store.writes(), 1);
        assert_eq!(store.count(EntityKind::Account), 1);
    }

    #[tokio::test]
    async fn distinct_addresses_get_distinct_records() {
        let store = Arc::new(TestStore::default());
        let registry = AccountRegistry::new(store.clone());

        for name in ["Alice", "Bob", "Alice", "Charlie", "Bob"] {
            registry.resolve(&AccountId::new(name).unwrap()).await.unwrap();
        }

        assert_eq!(store.count(EntityKind::Account), 3);
        assert_eq!(store.writes(), 3);
    }

    #[tokio::test]
    async fn ensure_reports_creation() {
        let store = Arc::new(TestStore::default());
        let registry = AccountRegistry::new(store);
        let bob = AccountId::new("Bob").unwrap();

        assert!(registry.ensure(&bob).await.unwrap());
        assert!(!registry.ensure(&bob).await.unwrap());
    }
}
