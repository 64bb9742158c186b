//! Module handlers for the karscan indexer.
//!
//! Each handler turns the events or extrinsics of one chain module into
//! Transfer derivations. Handlers are pure; the pipeline in `karscan-core`
//! owns account creation and persistence.
//!
//! # Usage
//!
//! ```ignore
//! use karscan_handlers::{HandlerConfig, default_registry};
//!
//! let handlers = default_registry(HandlerConfig::default(), Arc::new(TracingDiagnostics));
//! let pipeline = Pipeline::new(PipelineConfig::default(), store, Arc::new(handlers));
//! ```

pub mod balances;
pub mod currencies;
pub mod utils;

use std::sync::Arc;

use karscan_core::ports::HandlerRegistry;
use karscan_core::token::{DiagnosticSink, TokenResolver};

pub use balances::{BalancesHandler, NATIVE_TOKEN};
pub use currencies::CurrenciesHandler;

/// Settings shared by the built-in handlers.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Symbol recorded on native-currency transfers.
    pub native_token: String,
    /// Foreign asset table used by the currencies handler.
    pub resolver: TokenResolver,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            native_token: NATIVE_TOKEN.to_string(),
            resolver: TokenResolver::default(),
        }
    }
}

/// Build a registry holding the currencies and balances handlers.
pub fn default_registry(
    config: HandlerConfig,
    diagnostics: Arc<dyn DiagnosticSink>,
) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(CurrenciesHandler::new(config.resolver, diagnostics)));
    registry.register(Arc::new(BalancesHandler::new(config.native_token)));
    registry
}
