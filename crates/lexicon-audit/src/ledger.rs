//! The owned handle for one logical chain.
//!
//! A `Ledger` bundles a store with the builder, verifier and query facade
//! that operate on it.  There is no process-wide chain: each tenant (or any
//! other unit of separation) constructs its own `Ledger` and passes it by
//! reference to whoever records or audits actions.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::info;

use lexicon_contracts::{
    chain::{ChainId, ExportId},
    entry::{Checkpoint, Digest, LedgerEntry, LedgerExport, TailSnapshot},
    error::LedgerResult,
    event::AuditEvent,
    verify::{SequenceRange, VerificationResult},
};
use lexicon_core::{
    builder::{BuilderOptions, ChainBuilder},
    hash::Sha256HashEngine,
    traits::{EventValidator, HashEngine, LedgerStore},
};

use crate::{
    file::FileLedgerStore,
    memory::InMemoryLedgerStore,
    query::QueryFacade,
    verifier::IntegrityVerifier,
};

pub struct Ledger {
    chain_id: ChainId,
    store: Arc<dyn LedgerStore>,
    engine: Arc<dyn HashEngine>,
    builder: ChainBuilder,
    verifier: IntegrityVerifier,
    query: QueryFacade,
}

impl Ledger {
    /// Assemble a ledger over `store` using SHA-256 and default options.
    pub fn new(chain_id: ChainId, store: Arc<dyn LedgerStore>) -> Self {
        Self::with_parts(
            chain_id,
            store,
            Arc::new(Sha256HashEngine),
            BuilderOptions::default(),
            Vec::new(),
        )
    }

    /// Assemble a ledger from explicit parts.
    pub fn with_parts(
        chain_id: ChainId,
        store: Arc<dyn LedgerStore>,
        engine: Arc<dyn HashEngine>,
        options: BuilderOptions,
        validators: Vec<Box<dyn EventValidator>>,
    ) -> Self {
        let builder = validators.into_iter().fold(
            ChainBuilder::new(chain_id.clone(), store.clone(), engine.clone())
                .with_options(options),
            ChainBuilder::with_validator,
        );
        let verifier = IntegrityVerifier::new(chain_id.clone(), store.clone(), engine.clone());
        let query = QueryFacade::new(store.clone());

        Self {
            chain_id,
            store,
            engine,
            builder,
            verifier,
            query,
        }
    }

    /// A volatile chain starting at genesis.
    pub fn in_memory(chain_id: ChainId) -> Self {
        Self::new(chain_id, Arc::new(InMemoryLedgerStore::new()))
    }

    /// A durable chain backed by the JSON Lines file at `path`.
    pub fn open_file(chain_id: ChainId, path: impl AsRef<Path>, sync_on_append: bool) -> LedgerResult<Self> {
        let store = FileLedgerStore::open(path, sync_on_append)?;
        Ok(Self::new(chain_id, Arc::new(store)))
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn query(&self) -> &QueryFacade {
        &self.query
    }

    pub fn verifier(&self) -> &IntegrityVerifier {
        &self.verifier
    }

    pub fn tail(&self) -> LedgerResult<TailSnapshot> {
        self.store.tail()
    }

    pub fn len(&self) -> LedgerResult<u64> {
        self.store.len()
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        self.store.is_empty()
    }

    /// Record one event.  See `ChainBuilder::submit`.
    pub fn submit(&self, event: AuditEvent) -> LedgerResult<LedgerEntry> {
        self.builder.submit(event)
    }

    pub fn submit_with_deadline(&self, event: AuditEvent, deadline: Instant) -> LedgerResult<LedgerEntry> {
        self.builder.submit_with_deadline(event, deadline)
    }

    pub fn verify(&self, range: impl Into<SequenceRange>) -> LedgerResult<VerificationResult> {
        self.verifier.verify(range)
    }

    pub fn verify_all(&self) -> LedgerResult<VerificationResult> {
        self.verifier.verify_all()
    }

    pub fn checkpoint(&self) -> LedgerResult<Checkpoint> {
        self.verifier.checkpoint()
    }

    pub fn verify_checkpoint(&self, checkpoint: &Checkpoint) -> LedgerResult<VerificationResult> {
        self.verifier.verify_checkpoint(checkpoint)
    }

    /// Seal every committed entry into a `LedgerExport`.
    pub fn export(&self) -> LedgerResult<LedgerExport> {
        let entries = self.store.read(SequenceRange::all())?;
        let terminal_hash = entries.last().map_or(Digest::GENESIS, |e| e.hash);

        info!(
            chain_id = %self.chain_id,
            entries = entries.len(),
            algorithm = self.engine.algorithm(),
            terminal_hash = %terminal_hash,
            "ledger exported"
        );

        Ok(LedgerExport {
            export_id: ExportId::new(),
            chain_id: self.chain_id.clone(),
            entries,
            exported_at: Utc::now(),
            terminal_hash,
            hash_algorithm: self.engine.algorithm().to_string(),
        })
    }
}
