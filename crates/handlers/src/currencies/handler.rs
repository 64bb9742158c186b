//! Handler for the Currencies module.
//!
//! # Supported Events
//!
//! - `Deposited`: tokens minted into an account (currency, who, amount)
//! - `Transferred`: tokens moved between accounts (currency, from, to, amount)

use std::sync::Arc;

use tracing::trace;

use karscan_core::error::{DomainError, DomainResult};
use karscan_core::ids;
use karscan_core::models::{BlockContext, Transfer};
use karscan_core::ports::{Derivations, ModuleHandler, RawEvent};
use karscan_core::token::{CurrencyId, DiagnosticSink, TokenResolver};

use crate::utils::{parse_address, parse_amount, raw_field, require_field};

// =============================================================================
// Handler
// =============================================================================

/// Derives Transfers from multi-currency deposit and transfer events.
pub struct CurrenciesHandler {
    resolver: TokenResolver,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl CurrenciesHandler {
    pub fn new(resolver: TokenResolver, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            resolver,
            diagnostics,
        }
    }

    /// Resolve the currency descriptor at the given position to a symbol.
    fn token(&self, event: &RawEvent, index: usize) -> DomainResult<String> {
        let raw = raw_field(&event.data, &["currency_id", "currencyId"], index).ok_or_else(|| {
            DomainError::DecodingError(format!(
                "{}.{} #{}: missing currency id",
                event.module, event.method, event.index
            ))
        })?;
        let currency = CurrencyId::decode(raw)?;
        Ok(self.resolver.resolve(&currency, self.diagnostics.as_ref()))
    }

    /// Process a Deposited event. The deposit has no sender.
    fn process_deposit(&self, event: &RawEvent, block: &BlockContext) -> DomainResult<Transfer> {
        let token = self.token(event, 0)?;
        let to = require_field(event, "who", &["who", "to"], 1, parse_address)?;
        let amount = require_field(event, "amount", &["amount"], 2, parse_amount)?;

        Ok(Transfer {
            id: ids::transfer_id(block.number, event.index),
            block_number: block.number,
            token,
            amount,
            from: None,
            to,
            tx_hash: event.tx_hash().cloned(),
            timestamp: block.timestamp,
        })
    }

    /// Process a Transferred event.
    fn process_transfer(&self, event: &RawEvent, block: &BlockContext) -> DomainResult<Transfer> {
        let token = self.token(event, 0)?;
        let from = require_field(event, "from", &["from"], 1, parse_address)?;
        let to = require_field(event, "to", &["to"], 2, parse_address)?;
        let amount = require_field(event, "amount", &["amount"], 3, parse_amount)?;

        Ok(Transfer {
            id: ids::transfer_id(block.number, event.index),
            block_number: block.number,
            token,
            amount,
            from: Some(from),
            to,
            tx_hash: event.tx_hash().cloned(),
            timestamp: block.timestamp,
        })
    }
}

impl ModuleHandler for CurrenciesHandler {
    fn module_name(&self) -> &'static str {
        "currencies"
    }

    fn handle_event(&self, event: &RawEvent, block: &BlockContext) -> DomainResult<Derivations> {
        let transfer = match event.method.as_str() {
            "Deposited" => self.process_deposit(event, block)?,
            "Transferred" => self.process_transfer(event, block)?,
            other => {
                trace!(method = other, "Unclassified currencies event");
                return Ok(Derivations::new());
            }
        };
        Ok(Derivations::transfer(transfer))
    }
}
