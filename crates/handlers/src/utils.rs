//! Shared utilities for module handlers.
//!
//! This module provides common parsing and extraction functions used across
//! handlers to read positional or named event fields.

use karscan_core::error::{DomainError, DomainResult};
use karscan_core::models::{AccountId, Amount};
use karscan_core::ports::RawEvent;

// =============================================================================
// Event field extraction
// =============================================================================

/// Extract a field from event data, trying multiple key names and falling back to index.
///
/// This function attempts to find a value in the event data by:
/// 1. First trying each key in the `keys` slice in order
/// 2. If no key matches, falling back to accessing by `index`
/// 3. Parsing the found value using the provided `parser` function
///
/// # Example
///
/// ```ignore
/// let from = extract_field(data, &["from", "who"], 0, parse_address);
/// ```
pub fn extract_field<T>(
    data: &serde_json::Value,
    keys: &[&str],
    index: usize,
    parser: fn(&serde_json::Value) -> Option<T>,
) -> Option<T> {
    raw_field(data, keys, index).and_then(parser)
}

/// Locate a field without parsing it.
pub fn raw_field<'a>(
    data: &'a serde_json::Value,
    keys: &[&str],
    index: usize,
) -> Option<&'a serde_json::Value> {
    keys.iter()
        .find_map(|key| data.get(*key))
        .or_else(|| data.get(index))
}

/// Like [`extract_field`], but a missing or unparseable field is a
/// decoding error naming the event and the field.
pub fn require_field<T>(
    event: &RawEvent,
    name: &str,
    keys: &[&str],
    index: usize,
    parser: fn(&serde_json::Value) -> Option<T>,
) -> DomainResult<T> {
    extract_field(&event.data, keys, index, parser).ok_or_else(|| {
        DomainError::DecodingError(format!(
            "{}.{} #{}: missing or invalid '{}'",
            event.module, event.method, event.index, name
        ))
    })
}

// =============================================================================
// Account parsing
// =============================================================================

/// Parse an address from various JSON representations.
///
/// Handles multiple formats that may be returned by Substrate nodes:
/// - Address string (SS58 or hex): `"5Grw..."`, `"0x1234..."`
/// - Wrapped object: `{ "Id": "..." }`
/// - Array wrapper: `["..."]`
/// - Byte array: `[b0, b1, ..., b31]`, rendered as 0x-prefixed hex
pub fn parse_address(value: &serde_json::Value) -> Option<AccountId> {
    match value {
        serde_json::Value::String(s) => AccountId::new(s.as_str()).ok(),
        // Wrapped object: { "Id": "..." }
        serde_json::Value::Object(obj) => obj
            .get("Id")
            .or_else(|| obj.get("id"))
            .and_then(parse_address),
        // Array: either ["..."] or [b0, b1, ..., b31]
        serde_json::Value::Array(arr) => {
            if arr.len() == 1 {
                return parse_address(&arr[0]);
            }
            if arr.len() != 32 {
                return None;
            }
            let mut bytes = [0u8; 32];
            for (i, v) in arr.iter().enumerate() {
                bytes[i] = v.as_u64()?.try_into().ok()?;
            }
            AccountId::new(format!("0x{}", hex::encode(bytes))).ok()
        }
        _ => None,
    }
}

// =============================================================================
// Numeric parsing
// =============================================================================

/// Parse an amount from JSON.
///
/// Handles both numeric and string representations. Numbers keep their
/// literal digits (`arbitrary_precision`), so no width limit applies.
pub fn parse_amount(value: &serde_json::Value) -> Option<Amount> {
    match value {
        serde_json::Value::Number(n) => Amount::parse(&n.to_string()).ok(),
        serde_json::Value::String(s) => Amount::parse(s).ok(),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
