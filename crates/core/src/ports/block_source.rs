//! Port trait for the block source.
//!
//! The source delivers blocks in chain order, each carrying its extrinsics
//! and events in a stable order that is reproducible on replay.
//! Implementations live outside the core (e.g. the JSON-lines reader in
//! the `karscan` binary).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::ChainResult;
use crate::models::{BlockContext, BlockHash, TxHash};

/// Raw block data before derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBlock {
    /// Block number.
    pub number: u64,
    /// Block hash.
    #[serde(default)]
    pub hash: Option<BlockHash>,
    /// Block timestamp in milliseconds (from the timestamp inherent).
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// Extrinsics in block order.
    #[serde(default)]
    pub extrinsics: Vec<RawExtrinsic>,
    /// Events in block order.
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

impl RawBlock {
    /// Height and timestamp shared by everything in this block.
    pub fn context(&self) -> BlockContext {
        let timestamp = self.timestamp.and_then(|ms| {
            i64::try_from(ms)
                .ok()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
        });
        BlockContext::new(self.number, timestamp)
    }
}

/// Execution phase an event was emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// While applying the extrinsic at this index.
    ApplyExtrinsic(u32),
    /// Block initialization (`on_initialize` hooks).
    Initialization,
    /// Block finalization (`on_finalize` hooks).
    Finalization,
}

/// Reference from an event to the extrinsic that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrinsicRef {
    pub hash: TxHash,
    pub success: bool,
}

/// Raw event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Index in block.
    pub index: u32,
    /// Module (section) name.
    pub module: String,
    /// Event variant name.
    pub method: String,
    /// Ordered event fields as JSON.
    #[serde(default)]
    pub data: serde_json::Value,
    pub phase: Phase,
    /// Owning extrinsic (if applicable).
    #[serde(default)]
    pub extrinsic: Option<ExtrinsicRef>,
}

impl RawEvent {
    /// Whether this event was emitted while applying an extrinsic.
    pub fn during_extrinsic(&self) -> bool {
        matches!(self.phase, Phase::ApplyExtrinsic(_))
    }

    /// Module (case-insensitive) and method (exact) match.
    pub fn is(&self, module: &str, method: &str) -> bool {
        self.module.eq_ignore_ascii_case(module) && self.method == method
    }

    /// Hash of the owning extrinsic.
    pub fn tx_hash(&self) -> Option<&TxHash> {
        self.extrinsic.as_ref().map(|e| &e.hash)
    }
}

/// One declared extrinsic argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArg {
    pub name: String,
    pub value: serde_json::Value,
}

impl RawArg {
    /// String rendering stored on the Extrinsic record.
    ///
    /// Strings are kept as-is; everything else is rendered as compact JSON.
    pub fn display_value(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Raw extrinsic data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExtrinsic {
    /// Transaction hash.
    pub hash: TxHash,
    /// Index in block.
    pub index: u32,
    /// Signer address (if signed).
    #[serde(default)]
    pub signer: Option<String>,
    /// Module (section) name.
    pub module: String,
    /// Call name.
    pub method: String,
    /// Declared arguments in call order.
    #[serde(default)]
    pub args: Vec<RawArg>,
    /// Success flag.
    pub success: bool,
    /// Events emitted while applying this extrinsic, in emission order.
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// Stream of blocks in chain order.
pub type BlockStream = Pin<Box<dyn Stream<Item = ChainResult<RawBlock>> + Send>>;

/// Port trait for the block source.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Human-readable description for logs (file path, endpoint...).
    fn describe(&self) -> String;

    /// Open the stream of blocks to index.
    async fn blocks(&self) -> ChainResult<BlockStream>;
}
