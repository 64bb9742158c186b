//! Core services: account registry, per-item pipeline and block driver.

mod accounts;
mod indexer;
mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;

pub use accounts::AccountRegistry;
pub use indexer::{IndexerConfig, IndexerService, RunSummary};
pub use pipeline::{EventPhasePolicy, Outcome, Pipeline, PipelineConfig};
