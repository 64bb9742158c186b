//! Deterministic record identifiers.
//!
//! Every id is derived from chain positions only, so re-indexing the same
//! block always yields the same keys:
//!
//! | Record | Key |
//! |--------|-----|
//! | Event, event-derived Transfer | `<height>-<event index>` |
//! | Transfer embedded in an extrinsic | `<height>-<extrinsic index>-<position in extrinsic events>` |
//! | Extrinsic | transaction hash |
//! | Extrinsic block position | `<height>-<extrinsic index>` |
//!
//! No id includes a content hash.

use crate::models::TxHash;

/// Id of the generic Event record for the event at `index` in block `height`.
pub fn event_id(height: u64, index: u32) -> String {
    format!("{height}-{index}")
}

/// Id of a Transfer derived from the event at `event_index` in block `height`.
///
/// Shares the event's id: at most one Transfer is derived per event.
pub fn transfer_id(height: u64, event_index: u32) -> String {
    event_id(height, event_index)
}

/// Id of a Transfer found inside an extrinsic's own event list.
///
/// The three-part shape cannot collide with the two-part event ids.
pub fn embedded_transfer_id(height: u64, extrinsic_index: u32, position: usize) -> String {
    format!("{height}-{extrinsic_index}-{position}")
}

/// Position attribute of an Extrinsic record.
pub fn block_position(height: u64, extrinsic_index: u32) -> String {
    format!("{height}-{extrinsic_index}")
}

/// Key of an Extrinsic record.
pub fn extrinsic_id(hash: &TxHash) -> String {
    hash.to_hex()
}
