//! Shared helper functions for PostgreSQL row conversion.

use karscan_core::error::{StorageError, StorageResult};
use karscan_core::models::{AccountId, Amount, TxHash};

/// Map an insert failure, separating constraint violations (not retryable)
/// from other query errors.
pub fn write_error(e: sqlx::Error) -> StorageError {
    if let Some(db_err) = e.as_database_error()
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        return StorageError::ConstraintViolation(db_err.message().to_string());
    }
    StorageError::QueryError(e.to_string())
}

/// Convert a `Vec<u8>` to a fixed-size 32-byte array.
///
/// Returns an error if the length doesn't match.
pub fn bytes_to_hash32(bytes: Vec<u8>, field_name: &str) -> StorageResult<[u8; 32]> {
    bytes.try_into().map_err(|v: Vec<u8>| {
        StorageError::SerializationError(format!(
            "{} has invalid length: expected 32, got {}",
            field_name,
            v.len()
        ))
    })
}

/// Convert an optional `Vec<u8>` to an optional transaction hash.
pub fn bytes_to_optional_tx_hash(
    bytes: Option<Vec<u8>>,
    field_name: &str,
) -> StorageResult<Option<TxHash>> {
    match bytes {
        Some(b) => Ok(Some(TxHash(bytes_to_hash32(b, field_name)?))),
        None => Ok(None),
    }
}

/// Parse a 0x-hex record key into a transaction hash.
pub fn key_to_tx_hash(key: &str) -> StorageResult<TxHash> {
    TxHash::from_hex(key).map_err(|e| {
        StorageError::SerializationError(format!("invalid extrinsic key {key:?}: {e}"))
    })
}

/// Rebuild an account reference read from a row.
pub fn to_account(value: String, field_name: &str) -> StorageResult<AccountId> {
    AccountId::new(value)
        .map_err(|e| StorageError::SerializationError(format!("{field_name}: {e}")))
}

/// Rebuild an amount read back as `NUMERIC::TEXT`.
pub fn to_amount(value: &str, field_name: &str) -> StorageResult<Amount> {
    Amount::parse(value)
        .map_err(|e| StorageError::SerializationError(format!("{field_name}: {e}")))
}

/// Convert an unsigned height to a BIGINT column value.
pub fn to_i64(value: u64, field_name: &str) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!("{field_name} {value} exceeds BIGINT range"))
    })
}

/// Convert an event index to an INTEGER column value.
pub fn to_i32(value: u32, field_name: &str) -> StorageResult<i32> {
    i32::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!("{field_name} {value} exceeds INTEGER range"))
    })
}
