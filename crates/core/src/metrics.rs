//! Metrics definitions for the indexer.
//!
//! This module defines all metrics used throughout the indexer.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

use crate::models::EntityKind;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "records_derived_total",
        "Total number of records written to the store, by entity kind"
    );
    describe_counter!(
        "records_skipped_total",
        "Total number of derived records dropped because their input was malformed"
    );
    describe_counter!(
        "duplicate_records_total",
        "Total number of writes skipped because the record already existed"
    );
    describe_counter!(
        "unrecognized_currency_total",
        "Total number of currency ids resolved to the placeholder symbol"
    );
    describe_counter!(
        "handler_errors_total",
        "Total number of handler errors during event/extrinsic processing"
    );
    describe_counter!(
        "blocks_indexed_total",
        "Total number of blocks successfully indexed"
    );
    describe_counter!(
        "store_retries_total",
        "Total number of block retries after a retryable storage failure"
    );
    describe_histogram!(
        "block_processing_duration_seconds",
        "Time taken to process a block in seconds"
    );
}

/// Record a newly persisted record.
pub fn record_derived(kind: EntityKind) {
    counter!("records_derived_total", "kind" => kind.as_str()).increment(1);
}

/// Record a write skipped by the existence check.
pub fn record_duplicate(kind: EntityKind) {
    counter!("duplicate_records_total", "kind" => kind.as_str()).increment(1);
}

/// Record a derived record dropped because of a malformed input.
///
/// # Arguments
/// * `kind` - The record that was not derived
/// * `module` - The module the input came from
pub fn record_skipped(kind: EntityKind, module: &str) {
    counter!("records_skipped_total", "kind" => kind.as_str(), "module" => module.to_string())
        .increment(1);
}

/// Record a currency id resolved to the placeholder symbol.
pub fn record_unrecognized_currency() {
    counter!("unrecognized_currency_total").increment(1);
}

/// Record a handler error.
///
/// # Arguments
/// * `handler_type` - The type of handler ("event" or "extrinsic")
/// * `module` - The module name
pub fn record_handler_error(handler_type: &str, module: &str) {
    counter!("handler_errors_total", "type" => handler_type.to_string(), "module" => module.to_string())
        .increment(1);
}

/// Record a successfully indexed block.
pub fn record_block_indexed() {
    counter!("blocks_indexed_total").increment(1);
}

/// Record a block retry after a storage failure.
pub fn record_store_retry() {
    counter!("store_retries_total").increment(1);
}

/// Record block processing duration.
pub fn record_block_processing_duration(duration_secs: f64) {
    histogram!("block_processing_duration_seconds").record(duration_secs);
}

/// A timer that automatically records duration when dropped.
pub struct ProcessingTimer {
    start: Instant,
}

impl ProcessingTimer {
    /// Start a new processing timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for ProcessingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessingTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_block_processing_duration(duration);
    }
}
