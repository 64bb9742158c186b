//! Currencies module handler.
//!
//! # Indexed Events
//!
//! - `Currencies::Deposited` - Mint into an account, no sender
//! - `Currencies::Transferred` - Transfer between accounts

mod handler;

pub use handler::CurrenciesHandler;
