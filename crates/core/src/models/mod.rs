//! Domain models representing derived records.
//!
//! These models are storage-agnostic. All of them are immutable once
//! persisted; the store only ever sees first-write-wins creations.

use std::fmt;

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

// =============================================================================
// 32-byte Hash Types
// =============================================================================

/// Macro to generate 32-byte hash newtypes with common functionality.
///
/// Generates:
/// - `from_hex()` - Parse from hex string (with or without 0x prefix)
/// - `to_hex()` - Convert to 0x-prefixed hex string
/// - `Display` trait implementation
/// - serde as a 0x-prefixed hex string
macro_rules! hash32_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Parse from hex string (with or without 0x prefix).
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(s)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| hex::FromHexError::InvalidStringLength)?;
                Ok(Self(arr))
            }

            /// Convert to 0x-prefixed hex string.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<String> for $name {
            type Error = hex::FromHexError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::from_hex(&s)
            }
        }

        impl From<$name> for String {
            fn from(hash: $name) -> Self {
                hash.to_hex()
            }
        }
    };
}

hash32_newtype!(
    /// 32-byte transaction (extrinsic) hash.
    TxHash
);

hash32_newtype!(
    /// 32-byte block hash.
    BlockHash
);

// =============================================================================
// Scalars
// =============================================================================

/// Chain address used as the Account key and as the foreign-key value of
/// every record that references an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Validate a non-blank address. The address is kept verbatim.
    pub fn new(address: impl Into<String>) -> DomainResult<Self> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(DomainError::InvalidAddress("empty address".into()));
        }
        Ok(Self(address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token amount as a canonical decimal string.
///
/// On-chain balances can exceed `u128`, so the value is never narrowed to a
/// machine integer or a float. Leading zeros are stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(String);

impl Amount {
    /// Parse a decimal string or a `0x` hex string of any width.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();

        if let Some(hex_digits) = raw.strip_prefix("0x") {
            if !hex_digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(DomainError::InvalidAmount(raw.to_string()));
            }
            let value = BigUint::parse_bytes(hex_digits.as_bytes(), 16)
                .ok_or_else(|| DomainError::InvalidAmount(raw.to_string()))?;
            return Ok(Self(value.to_string()));
        }

        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidAmount(raw.to_string()));
        }

        let canonical = raw.trim_start_matches('0');
        if canonical.is_empty() {
            Ok(Self("0".to_string()))
        } else {
            Ok(Self(canonical.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Block-level context shared by every event and extrinsic of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    /// Block height.
    pub number: u64,
    /// Block timestamp (from the timestamp inherent), if known.
    pub timestamp: Option<DateTime<Utc>>,
}

impl BlockContext {
    pub fn new(number: u64, timestamp: Option<DateTime<Utc>>) -> Self {
        Self { number, timestamp }
    }
}

// =============================================================================
// Records
// =============================================================================

/// An address that has been seen as a transfer party or extrinsic sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Address, also the record key.
    pub id: AccountId,
}

/// A currency movement, either from the `currencies` module or a native
/// balance transfer embedded in an extrinsic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Unique identifier, see [`crate::ids`].
    pub id: String,
    /// Block height containing this transfer.
    pub block_number: u64,
    /// Resolved token symbol (e.g. `KAR`, `KAR<>KUSD LP`).
    pub token: String,
    /// Amount in the token's smallest unit.
    pub amount: Amount,
    /// Sender; absent for deposits and mints.
    pub from: Option<AccountId>,
    /// Recipient.
    pub to: AccountId,
    /// Hash of the extrinsic that caused the transfer.
    pub tx_hash: Option<TxHash>,
    /// Block timestamp (if available).
    pub timestamp: Option<DateTime<Utc>>,
}

/// Generic record of any processed chain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier: block_number-event_index.
    pub id: String,
    pub block_number: u64,
    /// Index within the block (0-based).
    pub index: u32,
    /// Module (section) name, e.g. `currencies`.
    pub module: String,
    /// Event method name, e.g. `Deposited`.
    pub method: String,
    /// Owning extrinsic, if the event was emitted while applying one.
    pub tx_hash: Option<TxHash>,
}

/// Generic record of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extrinsic {
    /// Transaction hash, also the record key.
    pub id: TxHash,
    /// Signer; `None` for unsigned extrinsics.
    pub sender: Option<AccountId>,
    /// Module (section) name.
    pub module: String,
    /// Call name.
    pub method: String,
    /// Argument values, rendered as strings.
    pub args: Vec<String>,
    /// Argument names, index-aligned with `args`.
    pub arg_names: Vec<String>,
    /// Success flag as reported by the source.
    pub success: bool,
    /// Position in the chain: block_number-extrinsic_index.
    pub block_position: String,
    pub block_number: u64,
    /// Block timestamp (if available).
    pub timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// Store envelope
// =============================================================================

/// Entity types known to the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Transfer,
    Event,
    Extrinsic,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Transfer => "transfer",
            Self::Event => "event",
            Self::Extrinsic => "extrinsic",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any persistable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Account(Account),
    Transfer(Transfer),
    Event(Event),
    Extrinsic(Extrinsic),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Account(_) => EntityKind::Account,
            Self::Transfer(_) => EntityKind::Transfer,
            Self::Event(_) => EntityKind::Event,
            Self::Extrinsic(_) => EntityKind::Extrinsic,
        }
    }

    /// Primary key within the record's entity type.
    pub fn key(&self) -> String {
        match self {
            Self::Account(a) => a.id.to_string(),
            Self::Transfer(t) => t.id.clone(),
            Self::Event(e) => e.id.clone(),
            Self::Extrinsic(x) => crate::ids::extrinsic_id(&x.id),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_hash_hex_roundtrip() {
        let hex = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        let hash = TxHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_hex(), hex);
    }

    #[test]
    fn tx_hash_serializes_as_hex_string() {
        let hash = TxHash([0xab; 32]);
        let json = serde_json::to_value(&hash).unwrap();
        assert_eq!(json, serde_json::json!(format!("0x{}", "ab".repeat(32))));

        let back: TxHash = serde_json::from_value(json).unwrap();
        assert_eq!(back, hash);
        assert!(serde_json::from_value::<TxHash>(serde_json::json!("0x1234")).is_err());
    }

    #[test]
    fn account_id_rejects_blank() {
        assert!(AccountId::new("").is_err());
        assert!(AccountId::new("   ").is_err());
        assert_eq!(AccountId::new(" Bob ").unwrap().as_str(), " Bob ");
    }

    #[test]
    fn amount_keeps_full_magnitude() {
        // Larger than u128::MAX
        let huge = "3402823669209384634633746074317682114550000";
        assert_eq!(Amount::parse(huge).unwrap().as_str(), huge);
        assert_eq!(Amount::parse("000500").unwrap().as_str(), "500");
        assert_eq!(Amount::parse("0").unwrap().as_str(), "0");
        assert_eq!(Amount::parse("0x1f4").unwrap().as_str(), "500");
    }

    #[test]
    fn amount_rejects_non_integers() {
        assert!(Amount::parse("").is_err());
        assert!(Amount::parse("-5").is_err());
        assert!(Amount::parse("1.5").is_err());
        assert!(Amount::parse("1e18").is_err());
        assert!(Amount::parse("0xzz").is_err());
        assert!(Amount::parse("0x").is_err());
        assert!(Amount::parse("0x1_0").is_err());
        assert!(Amount::parse("0x+1").is_err());
    }

    #[test]
    fn amount_hex_is_not_narrowed() {
        // 2^128
        assert_eq!(
            Amount::parse("0x100000000000000000000000000000000")
                .unwrap()
                .as_str(),
            "340282366920938463463374607431768211456"
        );
        assert_eq!(Amount::parse("0x0000").unwrap().as_str(), "0");
    }

    #[test]
    fn record_keys() {
        let hash = TxHash([0x01; 32]);
        let ext = Record::Extrinsic(Extrinsic {
            id: hash.clone(),
            sender: None,
            module: "system".into(),
            method: "remark".into(),
            args: vec![],
            arg_names: vec![],
            success: true,
            block_position: "1-0".into(),
            block_number: 1,
            timestamp: None,
        });
        assert_eq!(ext.kind(), EntityKind::Extrinsic);
        assert_eq!(ext.key(), hash.to_hex());

        let account = Record::Account(Account {
            id: AccountId::new("Alice").unwrap(),
        });
        assert_eq!(account.kind(), EntityKind::Account);
        assert_eq!(account.key(), "Alice");
    }
}
