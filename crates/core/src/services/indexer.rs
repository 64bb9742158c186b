//! Block driver - feeds blocks from a source through the pipeline.
//!
//! Blocks are processed strictly one at a time: every extrinsic of the
//! block first, then every event, each running to completion (account
//! lookups and writes included) before the next input starts.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{IndexerError, IndexerResult};
use crate::metrics::{ProcessingTimer, record_block_indexed, record_store_retry};
use crate::ports::{BlockSource, RawBlock};

use super::pipeline::{Outcome, Pipeline};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the indexer service.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Maximum retries of a block after a retryable storage failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub retry_delay: Duration,
    /// Upper bound of the exponential backoff.
    pub max_retry_delay: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

/// Totals over a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub blocks: u64,
    pub last_block: Option<u64>,
    pub outcome: Outcome,
}

// =============================================================================
// IndexerService
// =============================================================================

/// Drives a [`BlockSource`] through the [`Pipeline`].
pub struct IndexerService<S: BlockSource> {
    config: IndexerConfig,
    block_source: Arc<S>,
    pipeline: Arc<Pipeline>,
}

impl<S: BlockSource> IndexerService<S> {
    pub fn new(config: IndexerConfig, block_source: Arc<S>, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            block_source,
            pipeline,
        }
    }

    /// Index every block the source yields.
    ///
    /// Returns when the stream ends, or with
    /// [`IndexerError::ShutdownRequested`] when the shutdown flag is raised.
    #[instrument(skip_all, fields(source = %self.block_source.describe()))]
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> IndexerResult<RunSummary> {
        info!("⛓️  Starting indexer");

        let mut stream = self.block_source.blocks().await?;
        let mut summary = RunSummary::default();

        while let Some(result) = stream.next().await {
            if *shutdown_rx.borrow() {
                debug!("Shutdown requested");
                return Err(IndexerError::ShutdownRequested);
            }

            let raw_block = result?;
            let block_number = raw_block.number;
            self.check_sequence(summary.last_block, block_number);

            let outcome = self
                .process_block_with_retry(&raw_block, &mut shutdown_rx)
                .await?;

            if outcome.written() > 0 {
                info!(
                    block = block_number,
                    transfers = outcome.transfers,
                    events = outcome.events,
                    extrinsics = outcome.extrinsics,
                    accounts = outcome.accounts,
                    "⛓️  Block indexed"
                );
            } else {
                trace!(block = block_number, "Block produced no new records");
            }
            if outcome.skipped > 0 {
                warn!(
                    block = block_number,
                    skipped = outcome.skipped,
                    "⚠️  Block had malformed inputs"
                );
            }

            summary.blocks += 1;
            summary.last_block = Some(block_number);
            summary.outcome += outcome;
        }

        info!(
            blocks = summary.blocks,
            last_block = ?summary.last_block,
            transfers = summary.outcome.transfers,
            events = summary.outcome.events,
            extrinsics = summary.outcome.extrinsics,
            accounts = summary.outcome.accounts,
            duplicates = summary.outcome.duplicates,
            skipped = summary.outcome.skipped,
            "✅ Source exhausted"
        );

        Ok(summary)
    }

    /// Warn about gaps and replays in the delivered sequence.
    fn check_sequence(&self, last: Option<u64>, number: u64) {
        let Some(last) = last else {
            return;
        };
        if number > last + 1 {
            warn!(
                block = number,
                latest = last,
                gap = number - last - 1,
                "⚠️  Gap detected in block sequence"
            );
        } else if number <= last {
            debug!(block = number, latest = last, "Block delivered again, replaying");
        }
    }

    /// Process a block, retrying retryable storage failures with
    /// exponential backoff. Already written records are skipped on retry.
    async fn process_block_with_retry(
        &self,
        raw_block: &RawBlock,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> IndexerResult<Outcome> {
        let mut retry_delay = self.config.retry_delay;
        let mut attempt = 0;

        loop {
            match self.process_block(raw_block).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        block = raw_block.number,
                        attempt,
                        error = %e,
                        retry_in_ms = retry_delay.as_millis(),
                        "⚠️  Storage failure, retrying block"
                    );
                    record_store_retry();

                    tokio::select! {
                        _ = tokio::time::sleep(retry_delay) => {
                            retry_delay = (retry_delay * 2).min(self.config.max_retry_delay);
                        }
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                return Err(IndexerError::ShutdownRequested);
                            }
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Process a single block through the pipeline.
    #[instrument(skip(self, raw_block), fields(block = raw_block.number))]
    async fn process_block(&self, raw_block: &RawBlock) -> IndexerResult<Outcome> {
        let _timer = ProcessingTimer::new();
        let block = raw_block.context();
        let mut outcome = Outcome::default();

        for extrinsic in &raw_block.extrinsics {
            outcome += self.pipeline.on_extrinsic(extrinsic, &block).await?;
        }

        for event in &raw_block.events {
            outcome += self.pipeline.on_event(event, &block).await?;
        }

        record_block_indexed();
        trace!("Block processed successfully");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainResult;
    use crate::models::{EntityKind, TxHash};
    use crate::ports::{BlockStream, HandlerRegistry, Phase, RawEvent, RawExtrinsic};
    use crate::services::pipeline::PipelineConfig;
    use crate::services::test_support::TestStore;
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;

    struct VecSource(Vec<RawBlock>);

    #[async_trait]
    impl BlockSource for VecSource {
        fn describe(&self) -> String {
            "memory".into()
        }

        async fn blocks(&self) -> ChainResult<BlockStream> {
            let blocks: Vec<ChainResult<RawBlock>> = self.0.iter().cloned().map(Ok).collect();
            Ok(Box::pin(futures::stream::iter(blocks)))
        }
    }

    fn block(number: u64) -> RawBlock {
        let hash = TxHash([number as u8; 32]);
        RawBlock {
            number,
            hash: None,
            timestamp: Some(1_000 * number),
            extrinsics: vec![RawExtrinsic {
                hash: hash.clone(),
                index: 0,
                signer: Some("Alice".into()),
                module: "system".into(),
                method: "remark".into(),
                args: vec![],
                success: true,
                events: vec![],
            }],
            events: vec![RawEvent {
                index: 0,
                module: "system".into(),
                method: "ExtrinsicSuccess".into(),
                data: serde_json::json!([]),
                phase: Phase::ApplyExtrinsic(0),
                extrinsic: Some(crate::ports::ExtrinsicRef {
                    hash,
                    success: true,
                }),
            }],
        }
    }

    fn service(store: Arc<TestStore>, blocks: Vec<RawBlock>) -> IndexerService<VecSource> {
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            store,
            Arc::new(HandlerRegistry::new()),
        );
        let config = IndexerConfig {
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        };
        IndexerService::new(config, Arc::new(VecSource(blocks)), Arc::new(pipeline))
    }

    #[tokio::test]
    async fn indexes_every_block() {
        let store = Arc::new(TestStore::default());
        let (_tx, rx) = watch::channel(false);

        let summary = service(store.clone(), vec![block(1), block(2)])
            .run(rx)
            .await
            .unwrap();

        assert_eq!(summary.blocks, 2);
        assert_eq!(summary.last_block, Some(2));
        assert_eq!(summary.outcome.extrinsics, 2);
        assert_eq!(summary.outcome.events, 2);
        assert_eq!(summary.outcome.accounts, 1);
        assert_eq!(store.count(EntityKind::Event), 2);
    }

    #[tokio::test]
    async fn replayed_block_writes_nothing() {
        let store = Arc::new(TestStore::default());
        let (_tx, rx) = watch::channel(false);

        let summary = service(store.clone(), vec![block(1), block(1)])
            .run(rx)
            .await
            .unwrap();

        assert_eq!(summary.outcome.extrinsics, 1);
        assert_eq!(summary.outcome.events, 1);
        assert_eq!(summary.outcome.duplicates, 2);
    }

    #[tokio::test]
    async fn retries_after_transient_storage_failure() {
        let store = Arc::new(TestStore::default());
        store.failing_saves.store(2, Ordering::SeqCst);
        let (_tx, rx) = watch::channel(false);

        let summary = service(store.clone(), vec![block(1)]).run(rx).await.unwrap();

        assert_eq!(summary.blocks, 1);
        assert_eq!(store.count(EntityKind::Extrinsic), 1);
        assert_eq!(store.count(EntityKind::Event), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let store = Arc::new(TestStore::default());
        store.failing_saves.store(100, Ordering::SeqCst);
        let (_tx, rx) = watch::channel(false);

        let err = service(store, vec![block(1)]).run(rx).await.unwrap_err();
        assert!(matches!(err, IndexerError::Storage(_)));
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let store = Arc::new(TestStore::default());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let err = service(store, vec![block(1)]).run(rx).await.unwrap_err();
        assert!(matches!(err, IndexerError::ShutdownRequested));
    }
}
