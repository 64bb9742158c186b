//! Error types for the indexer domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DomainError`] - Malformed inputs and derivation rule violations
//! - [`StorageError`] - Record store errors
//! - [`ChainError`] - Block source errors
//! - [`IndexerError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Domain Errors
// =============================================================================

/// Problems with a single input item.
///
/// The pipeline treats these as skip-and-log conditions: the affected
/// derived record is dropped and the rest of the block keeps flowing.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Address failed validation.
    #[error("Invalid account address: {0}")]
    InvalidAddress(String),

    /// Amount is not a non-negative integer.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Event or extrinsic payload could not be decoded.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Record store errors.
///
/// These are never swallowed by the pipeline; the block driver decides
/// whether to retry based on [`StorageError::is_retryable`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database constraint was violated (unique, foreign key, etc.).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Stored data could not be mapped back into a record.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl StorageError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_) | Self::QueryError(_) | Self::TransactionError(_)
        )
    }
}

// =============================================================================
// Chain Errors
// =============================================================================

/// Block source errors.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The source could not be opened.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A block could not be read or decoded.
    #[error("Block decode error at {position}: {message}")]
    BlockDecodeError {
        /// Position in the source (line number, block number...).
        position: String,
        /// Error details.
        message: String,
    },

    /// Stream failed mid-way.
    #[error("Stream error: {0}")]
    StreamError(String),
}

// =============================================================================
// Indexer Errors
// =============================================================================

/// Top-level indexer orchestration errors.
///
/// This is the main error type returned by [`crate::services::IndexerService`]
/// and [`crate::services::Pipeline`].
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Domain logic error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Storage/database error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Block source error.
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Graceful shutdown was requested.
    ///
    /// This is not really an error but uses the error type for control flow.
    #[error("Indexer shutdown requested")]
    ShutdownRequested,
}

impl IndexerError {
    /// Whether the failed block may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            Self::Domain(DomainError::Storage(e)) => e.is_retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for indexer operations.
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for block source operations.
pub type ChainResult<T> = Result<T, ChainError>;
