//! Currency descriptor decoding and token symbol resolution.
//!
//! Currency ids arrive as (possibly nested) JSON, either structured or as the
//! JSON text rendering of the structure:
//!
//! ```text
//! {"token": "KAR"}
//! {"foreignAsset": 0}
//! {"dexShare": [{"token": "KAR"}, {"token": "KUSD"}]}
//! ```
//!
//! [`CurrencyId::decode`] turns that payload into a closed variant type once,
//! at the boundary. [`TokenResolver::resolve`] then pattern-matches over it.
//! Resolution never fails: shapes the resolver does not know degrade to
//! [`UNKNOWN_SYMBOL`] and are reported to a [`DiagnosticSink`].

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::error::{DomainError, DomainResult};
use crate::metrics::record_unrecognized_currency;

/// Placeholder symbol for unrecognized currency encodings.
pub const UNKNOWN_SYMBOL: &str = "??";

/// Separator between the two sides of a liquidity-pool token.
pub const LP_SEPARATOR: &str = "<>";

/// Suffix appended to liquidity-pool token symbols.
pub const LP_SUFFIX: &str = " LP";

/// Decoded currency descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrencyId {
    /// Named token, e.g. `KAR`.
    Token(String),
    /// Foreign asset referenced by registry index.
    ForeignAsset(u16),
    /// Liquidity-pool share of two underlying currencies.
    DexShare(Box<CurrencyId>, Box<CurrencyId>),
    /// Well-formed payload of a shape not handled here.
    Unknown(Value),
}

impl CurrencyId {
    /// Decode a currency payload.
    ///
    /// Strings are parsed as JSON first; a string that is not JSON is a
    /// malformed payload and the only error this function returns.
    pub fn decode(raw: &Value) -> DomainResult<Self> {
        match raw {
            Value::String(s) => {
                let parsed: Value = serde_json::from_str(s).map_err(|e| {
                    DomainError::DecodingError(format!("currency id {s:?} is not JSON: {e}"))
                })?;
                // A JSON string literal inside the string is still just a string.
                if parsed.is_string() {
                    return Ok(Self::Unknown(parsed));
                }
                Self::decode(&parsed)
            }
            other => Ok(Self::from_value(other)),
        }
    }

    fn from_value(value: &Value) -> Self {
        let Value::Object(obj) = value else {
            return Self::Unknown(value.clone());
        };
        if obj.len() != 1 {
            return Self::Unknown(value.clone());
        }

        if let Some(name) = field(obj, "token", "Token").and_then(Value::as_str) {
            return Self::Token(name.to_string());
        }

        if let Some(index) = field(obj, "foreignAsset", "ForeignAsset").and_then(parse_index) {
            return Self::ForeignAsset(index);
        }

        if let Some(Value::Array(sides)) = field(obj, "dexShare", "DexShare")
            && let [a, b] = sides.as_slice()
        {
            return Self::DexShare(Box::new(Self::from_value(a)), Box::new(Self::from_value(b)));
        }

        Self::Unknown(value.clone())
    }
}

fn field<'a>(
    obj: &'a serde_json::Map<String, Value>,
    camel: &str,
    pascal: &str,
) -> Option<&'a Value> {
    obj.get(camel).or_else(|| obj.get(pascal))
}

fn parse_index(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| v.try_into().ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Receiver for resolution diagnostics.
///
/// Passed into the resolver so resolution itself stays pure.
pub trait DiagnosticSink: Send + Sync {
    /// A currency payload could not be mapped to a symbol.
    fn unrecognized_currency(&self, raw: &Value);
}

/// Production sink: logs a warning and bumps a counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn unrecognized_currency(&self, raw: &Value) {
        warn!(currency = %raw, "Unrecognized currency id, using placeholder symbol");
        record_unrecognized_currency();
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Maps decoded currency ids to display symbols.
#[derive(Debug, Clone)]
pub struct TokenResolver {
    foreign_assets: BTreeMap<u16, String>,
}

impl Default for TokenResolver {
    fn default() -> Self {
        let mut foreign_assets = BTreeMap::new();
        foreign_assets.insert(0, "RMRK".to_string());
        Self { foreign_assets }
    }
}

impl TokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or override) the symbol of a foreign asset index.
    pub fn with_foreign_asset(mut self, index: u16, symbol: impl Into<String>) -> Self {
        self.foreign_assets.insert(index, symbol.into());
        self
    }

    /// Known foreign asset symbols by index.
    pub fn foreign_assets(&self) -> &BTreeMap<u16, String> {
        &self.foreign_assets
    }

    /// Resolve a currency id to its symbol.
    pub fn resolve(&self, currency: &CurrencyId, diagnostics: &dyn DiagnosticSink) -> String {
        match currency {
            CurrencyId::Token(name) => name.clone(),
            CurrencyId::ForeignAsset(index) => match self.foreign_assets.get(index) {
                Some(symbol) => symbol.clone(),
                None => {
                    diagnostics.unrecognized_currency(&serde_json::json!({ "foreignAsset": index }));
                    UNKNOWN_SYMBOL.to_string()
                }
            },
            CurrencyId::DexShare(a, b) => format!(
                "{}{}{}{}",
                self.resolve(a, diagnostics),
                LP_SEPARATOR,
                self.resolve(b, diagnostics),
                LP_SUFFIX
            ),
            CurrencyId::Unknown(raw) => {
                diagnostics.unrecognized_currency(raw);
                UNKNOWN_SYMBOL.to_string()
            }
        }
    }
}
