//! Balances module handler.
//!
//! # Indexed Extrinsics
//!
//! - Any successful `balances` extrinsic whose events contain a
//!   `Balances::Transfer` yields one native-currency Transfer

mod handler;

pub use handler::{BalancesHandler, NATIVE_TOKEN};
