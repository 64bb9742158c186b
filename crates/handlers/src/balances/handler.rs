//! Handler for the Balances module.
//!
//! Native-currency transfers are not read from the event stream. They are
//! derived when the owning extrinsic is processed, from the first
//! `balances.Transfer` event in the extrinsic's own event list.

use tracing::trace;

use karscan_core::error::DomainResult;
use karscan_core::ids;
use karscan_core::models::{BlockContext, Transfer};
use karscan_core::ports::{Derivations, ModuleHandler, RawExtrinsic};

use crate::utils::{parse_address, parse_amount, require_field};

/// Default symbol of the chain's native currency.
pub const NATIVE_TOKEN: &str = "KAR";

// =============================================================================
// Handler
// =============================================================================

/// Derives native-currency Transfers from successful balances extrinsics.
pub struct BalancesHandler {
    native_token: String,
}

impl BalancesHandler {
    pub fn new(native_token: impl Into<String>) -> Self {
        Self {
            native_token: native_token.into(),
        }
    }

    pub fn native_token(&self) -> &str {
        &self.native_token
    }
}

impl Default for BalancesHandler {
    fn default() -> Self {
        Self::new(NATIVE_TOKEN)
    }
}

impl ModuleHandler for BalancesHandler {
    fn module_name(&self) -> &'static str {
        "balances"
    }

    fn handle_extrinsic(
        &self,
        extrinsic: &RawExtrinsic,
        block: &BlockContext,
    ) -> DomainResult<Derivations> {
        if !extrinsic.success {
            trace!(ext = extrinsic.index, "Failed extrinsic, no transfer scan");
            return Ok(Derivations::new());
        }

        let Some((position, event)) = extrinsic
            .events
            .iter()
            .enumerate()
            .find(|(_, e)| e.is("balances", "Transfer"))
        else {
            return Ok(Derivations::new());
        };

        let from = require_field(event, "from", &["from"], 0, parse_address)?;
        let to = require_field(event, "to", &["to"], 1, parse_address)?;
        let amount = require_field(event, "amount", &["amount", "value"], 2, parse_amount)?;

        Ok(Derivations::transfer(Transfer {
            id: ids::embedded_transfer_id(block.number, extrinsic.index, position),
            block_number: block.number,
            token: self.native_token.clone(),
            amount,
            from: Some(from),
            to,
            tx_hash: Some(extrinsic.hash.clone()),
            timestamp: block.timestamp,
        }))
    }
}
