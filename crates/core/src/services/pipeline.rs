//! Per-item derivation pipeline.
//!
//! The block source hands the pipeline one event or one extrinsic at a
//! time. For each input the pipeline:
//!
//! 1. Applies the event-phase filter (events only)
//! 2. Dispatches to the module's [`ModuleHandler`], if any
//! 3. Creates Accounts referenced by the derived records
//! 4. Writes the derived Transfers and the generic Event/Extrinsic record
//!
//! Every write is preceded by a lookup on the record's deterministic key,
//! so delivering the same input twice leaves the store unchanged.

use std::ops::AddAssign;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, instrument, trace, warn};

use crate::error::{DomainError, IndexerResult, StorageResult};
use crate::ids;
use crate::metrics::{record_derived, record_duplicate, record_handler_error, record_skipped};
use crate::models::{AccountId, BlockContext, EntityKind, Event, Extrinsic, Record, Transfer};
use crate::ports::{Derivations, HandlerRegistry, RawEvent, RawExtrinsic, RecordStore};

use super::accounts::AccountRegistry;

// =============================================================================
// Configuration
// =============================================================================

/// Which events are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventPhasePolicy {
    /// Only events emitted while applying an extrinsic.
    #[default]
    ApplyExtrinsicOnly,
    /// Every event, including block initialization/finalization.
    All,
}

impl FromStr for EventPhasePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apply-extrinsic" | "apply_extrinsic" => Ok(Self::ApplyExtrinsicOnly),
            "all" => Ok(Self::All),
            _ => Err(format!(
                "Invalid event phase '{}'. Use 'apply-extrinsic' or 'all'.",
                s
            )),
        }
    }
}

/// Configuration for the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub event_phase: EventPhasePolicy,
}

// =============================================================================
// Outcome
// =============================================================================

/// What one or more inputs produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub accounts: u64,
    pub transfers: u64,
    pub events: u64,
    pub extrinsics: u64,
    /// Writes skipped because the record already existed.
    pub duplicates: u64,
    /// Derivations dropped because their input was malformed.
    pub skipped: u64,
    /// Events ignored by the phase filter.
    pub filtered: u64,
}

impl Outcome {
    /// Number of records written.
    pub fn written(&self) -> u64 {
        self.accounts + self.transfers + self.events + self.extrinsics
    }

    fn count_write(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::Account => self.accounts += 1,
            EntityKind::Transfer => self.transfers += 1,
            EntityKind::Event => self.events += 1,
            EntityKind::Extrinsic => self.extrinsics += 1,
        }
    }
}

impl AddAssign for Outcome {
    fn add_assign(&mut self, other: Self) {
        self.accounts += other.accounts;
        self.transfers += other.transfers;
        self.events += other.events;
        self.extrinsics += other.extrinsics;
        self.duplicates += other.duplicates;
        self.skipped += other.skipped;
        self.filtered += other.filtered;
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Per-event and per-extrinsic derivation entry point.
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn RecordStore>,
    handlers: Arc<HandlerRegistry>,
    accounts: AccountRegistry,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn RecordStore>,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            config,
            accounts: AccountRegistry::new(store.clone()),
            store,
            handlers,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one event.
    #[instrument(skip_all, fields(block = block.number, event = event.index))]
    pub async fn on_event(&self, event: &RawEvent, block: &BlockContext) -> IndexerResult<Outcome> {
        let mut outcome = Outcome::default();

        if self.config.event_phase == EventPhasePolicy::ApplyExtrinsicOnly
            && !event.during_extrinsic()
        {
            trace!(phase = ?event.phase, "Event outside extrinsic application, skipping");
            outcome.filtered += 1;
            return Ok(outcome);
        }

        if let Some(handler) = self.handlers.get(&event.module) {
            match handler.handle_event(event, block) {
                Ok(derivations) => self.persist(derivations, &mut outcome).await?,
                Err(e) => self.skip_malformed("event", &event.module, &event.method, e, &mut outcome)?,
            }
        }

        let record = Event {
            id: ids::event_id(block.number, event.index),
            block_number: block.number,
            index: event.index,
            module: event.module.clone(),
            method: event.method.clone(),
            tx_hash: event.tx_hash().cloned(),
        };
        self.write_once(Record::Event(record), &mut outcome).await?;

        Ok(outcome)
    }

    /// Process one extrinsic.
    #[instrument(skip_all, fields(block = block.number, ext = extrinsic.index))]
    pub async fn on_extrinsic(
        &self,
        extrinsic: &RawExtrinsic,
        block: &BlockContext,
    ) -> IndexerResult<Outcome> {
        let mut outcome = Outcome::default();

        let sender = extrinsic
            .signer
            .as_deref()
            .and_then(|signer| AccountId::new(signer).ok());
        if let Some(sender) = &sender {
            self.ensure_account(sender, &mut outcome).await?;
        }

        let (arg_names, args): (Vec<String>, Vec<String>) = extrinsic
            .args
            .iter()
            .map(|arg| (arg.name.clone(), arg.display_value()))
            .unzip();

        let record = Extrinsic {
            id: extrinsic.hash.clone(),
            sender,
            module: extrinsic.module.clone(),
            method: extrinsic.method.clone(),
            args,
            arg_names,
            success: extrinsic.success,
            block_position: ids::block_position(block.number, extrinsic.index),
            block_number: block.number,
            timestamp: block.timestamp,
        };
        self.write_once(Record::Extrinsic(record), &mut outcome)
            .await?;

        if let Some(handler) = self.handlers.get(&extrinsic.module) {
            match handler.handle_extrinsic(extrinsic, block) {
                Ok(derivations) => self.persist(derivations, &mut outcome).await?,
                Err(e) => self.skip_malformed(
                    "extrinsic",
                    &extrinsic.module,
                    &extrinsic.method,
                    e,
                    &mut outcome,
                )?,
            }
        }

        Ok(outcome)
    }

    /// Persist handler derivations, accounts first.
    async fn persist(&self, derivations: Derivations, outcome: &mut Outcome) -> StorageResult<()> {
        for transfer in derivations.transfers {
            self.persist_transfer(transfer, outcome).await?;
        }
        Ok(())
    }

    async fn persist_transfer(&self, transfer: Transfer, outcome: &mut Outcome) -> StorageResult<()> {
        if self.already_stored(EntityKind::Transfer, &transfer.id, outcome).await? {
            return Ok(());
        }

        if let Some(from) = &transfer.from {
            self.ensure_account(from, outcome).await?;
        }
        self.ensure_account(&transfer.to, outcome).await?;

        debug!(
            id = %transfer.id,
            token = %transfer.token,
            amount = %transfer.amount,
            "Transfer derived"
        );
        self.write(Record::Transfer(transfer), outcome).await
    }

    async fn ensure_account(&self, address: &AccountId, outcome: &mut Outcome) -> StorageResult<()> {
        if self.accounts.ensure(address).await? {
            outcome.accounts += 1;
        }
        Ok(())
    }

    async fn write_once(&self, record: Record, outcome: &mut Outcome) -> StorageResult<()> {
        if self.already_stored(record.kind(), &record.key(), outcome).await? {
            return Ok(());
        }
        self.write(record, outcome).await
    }

    async fn write(&self, record: Record, outcome: &mut Outcome) -> StorageResult<()> {
        let kind = record.kind();
        self.store.save(&record).await?;
        record_derived(kind);
        outcome.count_write(kind);
        Ok(())
    }

    async fn already_stored(
        &self,
        kind: EntityKind,
        key: &str,
        outcome: &mut Outcome,
    ) -> StorageResult<bool> {
        if !self.store.exists(kind, key).await? {
            return Ok(false);
        }
        debug!(kind = %kind, key, "Record already indexed, skipping");
        record_duplicate(kind);
        outcome.duplicates += 1;
        Ok(true)
    }

    /// Log and count a handler failure. Storage failures are not
    /// malformed input and are passed back up.
    fn skip_malformed(
        &self,
        handler_type: &str,
        module: &str,
        method: &str,
        error: DomainError,
        outcome: &mut Outcome,
    ) -> IndexerResult<()> {
        if let DomainError::Storage(e) = error {
            return Err(e.into());
        }
        warn!(module, method, error = %error, "Malformed {handler_type} payload, derivation skipped");
        record_handler_error(handler_type, module);
        record_skipped(EntityKind::Transfer, module);
        outcome.skipped += 1;
        Ok(())
    }
}
