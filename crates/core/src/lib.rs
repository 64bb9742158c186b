//! Core domain layer for the karscan indexer.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! the derivation pipeline that turns raw blocks into accounts, transfers,
//! events and extrinsics. It is the innermost layer with no dependencies
//! on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     karscan (binary)                        │
//! │            (config, logging, JSON-lines source)             │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │      karscan-handlers        │       karscan-storage        │
//! │  (currencies, balances)      │    (PostgreSQL, memory)      │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                     karscan-core  ← YOU ARE HERE            │
//! │        (models, ports, token resolver, pipeline)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Records (Account, Transfer, Event, Extrinsic) and scalars
//! - [`ports`] - Interface traits for adapters and handlers
//! - [`services`] - Account registry, pipeline and block driver
//! - [`token`] - Currency id decoding and symbol resolution
//! - [`ids`] - Deterministic record identifiers
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Data flow
//!
//! 1. A [`ports::BlockSource`] yields blocks in chain order
//! 2. [`services::IndexerService`] feeds each extrinsic, then each event,
//!    to the [`services::Pipeline`]
//! 3. The pipeline dispatches to the registered [`ports::ModuleHandler`]
//!    and writes the derived records through a [`ports::RecordStore`],
//!    creating referenced Accounts first

pub mod error;
pub mod ids;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
pub mod token;
