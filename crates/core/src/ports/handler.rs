//! Port trait for module-specific derivation rules.
//!
//! This is the main extensibility point for the indexer. Each runtime
//! module that yields domain records beyond the generic Event/Extrinsic
//! implements this trait. Handlers are pure: they read the raw input and
//! return the records to derive, and the pipeline takes care of accounts
//! and persistence.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DomainResult;
use crate::models::{BlockContext, Transfer};
use crate::ports::block_source::{RawEvent, RawExtrinsic};

/// Records derived by a handler from one input.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Derivations {
    /// Transfers to persist, in derivation order.
    pub transfers: Vec<Transfer>,
}

impl Derivations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derivations holding a single transfer.
    pub fn transfer(transfer: Transfer) -> Self {
        Self {
            transfers: vec![transfer],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }
}

/// Trait for module-specific derivation rules.
///
/// The handler is called for every event and extrinsic whose module name
/// matches [`ModuleHandler::module_name`] (ASCII case-insensitive).
pub trait ModuleHandler: Send + Sync {
    /// Module name this handler processes (e.g., "currencies", "balances").
    fn module_name(&self) -> &'static str;

    /// Derive records from an event of this module.
    ///
    /// An `Err` marks the event payload as malformed; the pipeline logs it,
    /// drops the derivation and carries on.
    fn handle_event(&self, _event: &RawEvent, _block: &BlockContext) -> DomainResult<Derivations> {
        Ok(Derivations::new())
    }

    /// Derive records from an extrinsic of this module.
    fn handle_extrinsic(
        &self,
        _extrinsic: &RawExtrinsic,
        _block: &BlockContext,
    ) -> DomainResult<Derivations> {
        Ok(Derivations::new())
    }
}

/// Registry for module handlers, keyed by lowercase module name.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ModuleHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a module, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn ModuleHandler>) {
        let module = handler.module_name().to_ascii_lowercase();
        self.handlers.insert(module, handler);
    }

    /// Get handler for a specific module.
    pub fn get(&self, module: &str) -> Option<&Arc<dyn ModuleHandler>> {
        self.handlers.get(&module.to_ascii_lowercase())
    }

    /// Check if a module has a registered handler.
    pub fn has_handler(&self, module: &str) -> bool {
        self.get(module).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// List all registered module names, sorted.
    pub fn registered_modules(&self) -> Vec<&str> {
        let mut modules: Vec<&str> = self.handlers.values().map(|h| h.module_name()).collect();
        modules.sort_unstable();
        modules
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
