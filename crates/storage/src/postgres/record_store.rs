//! Record store implementation for PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::trace;

use karscan_core::error::{StorageError, StorageResult};
use karscan_core::models::{Account, EntityKind, Event, Extrinsic, Record, Transfer};
use karscan_core::ports::RecordStore;

use super::database::Database;
use super::helpers::{
    bytes_to_hash32, bytes_to_optional_tx_hash, key_to_tx_hash, to_account, to_amount, to_i32,
    to_i64, write_error,
};

// =============================================================================
// Store Implementation
// =============================================================================

/// PostgreSQL implementation of [`RecordStore`].
///
/// Every insert is `ON CONFLICT DO NOTHING`, so a record that already
/// exists is never overwritten.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    async fn insert_account(&self, account: &Account) -> StorageResult<()> {
        sqlx::query("INSERT INTO accounts (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(account.id.as_str())
            .execute(&self.pool)
            .await
            .map_err(write_error)?;
        Ok(())
    }

    async fn insert_transfer(&self, transfer: &Transfer) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transfers (
                id, block_number, token, amount, from_account, to_account, tx_hash, timestamp
            )
            VALUES ($1, $2, $3, $4::NUMERIC, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&transfer.id)
        .bind(to_i64(transfer.block_number, "transfer.block_number")?)
        .bind(&transfer.token)
        .bind(transfer.amount.as_str())
        .bind(transfer.from.as_ref().map(|a| a.as_str()))
        .bind(transfer.to.as_str())
        .bind(transfer.tx_hash.as_ref().map(|h| &h.0[..]))
        .bind(transfer.timestamp)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn insert_event(&self, event: &Event) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, block_number, index, module, method, tx_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&event.id)
        .bind(to_i64(event.block_number, "event.block_number")?)
        .bind(to_i32(event.index, "event.index")?)
        .bind(&event.module)
        .bind(&event.method)
        .bind(event.tx_hash.as_ref().map(|h| &h.0[..]))
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn insert_extrinsic(&self, extrinsic: &Extrinsic) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO extrinsics (
                id, sender, module, method, args, arg_names,
                success, block_position, block_number, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&extrinsic.id.0[..])
        .bind(extrinsic.sender.as_ref().map(|a| a.as_str()))
        .bind(&extrinsic.module)
        .bind(&extrinsic.method)
        .bind(&extrinsic.args)
        .bind(&extrinsic.arg_names)
        .bind(extrinsic.success)
        .bind(&extrinsic.block_position)
        .bind(to_i64(extrinsic.block_number, "extrinsic.block_number")?)
        .bind(extrinsic.timestamp)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_account(&self, key: &str) -> StorageResult<Option<Record>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM accounts WHERE id = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(|(id,)| {
            Ok(Record::Account(Account {
                id: to_account(id, "account.id")?,
            }))
        })
        .transpose()
    }

    async fn get_transfer(&self, key: &str) -> StorageResult<Option<Record>> {
        let row = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT id, block_number, token, amount::TEXT AS amount,
                   from_account, to_account, tx_hash, timestamp
            FROM transfers
            WHERE id = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(|r| r.into_transfer().map(Record::Transfer)).transpose()
    }

    async fn get_event(&self, key: &str) -> StorageResult<Option<Record>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, block_number, index, module, method, tx_hash
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(|r| r.into_event().map(Record::Event)).transpose()
    }

    async fn get_extrinsic(&self, key: &str) -> StorageResult<Option<Record>> {
        let hash = key_to_tx_hash(key)?;
        let row = sqlx::query_as::<_, ExtrinsicRow>(
            r#"
            SELECT id, sender, module, method, args, arg_names,
                   success, block_position, block_number, timestamp
            FROM extrinsics
            WHERE id = $1
            "#,
        )
        .bind(&hash.0[..])
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(|r| r.into_extrinsic().map(Record::Extrinsic))
            .transpose()
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, kind: EntityKind, key: &str) -> StorageResult<Option<Record>> {
        match kind {
            EntityKind::Account => self.get_account(key).await,
            EntityKind::Transfer => self.get_transfer(key).await,
            EntityKind::Event => self.get_event(key).await,
            EntityKind::Extrinsic => self.get_extrinsic(key).await,
        }
    }

    async fn save(&self, record: &Record) -> StorageResult<()> {
        trace!(kind = %record.kind(), key = %record.key(), "Saving record");
        match record {
            Record::Account(a) => self.insert_account(a).await,
            Record::Transfer(t) => self.insert_transfer(t).await,
            Record::Event(e) => self.insert_event(e).await,
            Record::Extrinsic(x) => self.insert_extrinsic(x).await,
        }
    }

    async fn exists(&self, kind: EntityKind, key: &str) -> StorageResult<bool> {
        let (exists,): (bool,) = match kind {
            EntityKind::Account => {
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
                    .bind(key)
                    .fetch_one(&self.pool)
                    .await
            }
            EntityKind::Transfer => {
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM transfers WHERE id = $1)")
                    .bind(key)
                    .fetch_one(&self.pool)
                    .await
            }
            EntityKind::Event => {
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
                    .bind(key)
                    .fetch_one(&self.pool)
                    .await
            }
            EntityKind::Extrinsic => {
                let hash = key_to_tx_hash(key)?;
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM extrinsics WHERE id = $1)")
                    .bind(hash.0.to_vec())
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(exists)
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct TransferRow {
    id: String,
    block_number: i64,
    token: String,
    amount: String,
    from_account: Option<String>,
    to_account: String,
    tx_hash: Option<Vec<u8>>,
    timestamp: Option<DateTime<Utc>>,
}

impl TransferRow {
    fn into_transfer(self) -> StorageResult<Transfer> {
        Ok(Transfer {
            id: self.id,
            block_number: self.block_number as u64,
            token: self.token,
            amount: to_amount(&self.amount, "transfer.amount")?,
            from: self
                .from_account
                .map(|a| to_account(a, "transfer.from_account"))
                .transpose()?,
            to: to_account(self.to_account, "transfer.to_account")?,
            tx_hash: bytes_to_optional_tx_hash(self.tx_hash, "transfer.tx_hash")?,
            timestamp: self.timestamp,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    block_number: i64,
    index: i32,
    module: String,
    method: String,
    tx_hash: Option<Vec<u8>>,
}

impl EventRow {
    fn into_event(self) -> StorageResult<Event> {
        Ok(Event {
            id: self.id,
            block_number: self.block_number as u64,
            index: u32::try_from(self.index).map_err(|_| {
                StorageError::SerializationError(format!("event.index {} is negative", self.index))
            })?,
            module: self.module,
            method: self.method,
            tx_hash: bytes_to_optional_tx_hash(self.tx_hash, "event.tx_hash")?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExtrinsicRow {
    id: Vec<u8>,
    sender: Option<String>,
    module: String,
    method: String,
    args: Vec<String>,
    arg_names: Vec<String>,
    success: bool,
    block_position: String,
    block_number: i64,
    timestamp: Option<DateTime<Utc>>,
}

impl ExtrinsicRow {
    fn into_extrinsic(self) -> StorageResult<Extrinsic> {
        let id = bytes_to_hash32(self.id, "extrinsic.id")?;

        Ok(Extrinsic {
            id: id.into(),
            sender: self
                .sender
                .map(|s| to_account(s, "extrinsic.sender"))
                .transpose()?,
            module: self.module,
            method: self.method,
            args: self.args,
            arg_names: self.arg_names,
            success: self.success,
            block_position: self.block_position,
            block_number: self.block_number as u64,
            timestamp: self.timestamp,
        })
    }
}
