//! The chain builder: turns submitted events into linked, committed entries.
//!
//! Pipeline for every submission:
//!
//!   Validate → Snapshot tail → Canonicalize + hash → Compare-and-append
//!
//! Only the compare-and-append runs under the store's write lock.  Hashing
//! happens on a private tail snapshot; if another writer commits first, the
//! store reports a `SequenceConflict` and the builder rebuilds the entry
//! against the new tail.  Every conflict means some other entry committed, so
//! with `n` concurrent writers no submission loses more than `n - 1` races.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use lexicon_contracts::{
    chain::ChainId,
    entry::{Digest, LedgerEntry},
    error::{LedgerError, LedgerResult},
    event::AuditEvent,
};

use crate::{
    canonical::{canonicalize_details, CanonicalLimits, HashInput},
    traits::{ensure_before, EventValidator, HashEngine, LedgerStore},
};

/// Tunables for a `ChainBuilder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Attempts allowed per submission before a conflict is surfaced.
    pub max_retries: u32,
    /// Default deadline for `submit`, measured from the call.
    pub append_timeout: Option<Duration>,
    pub limits: CanonicalLimits,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            max_retries: 64,
            append_timeout: None,
            limits: CanonicalLimits::default(),
        }
    }
}

/// Builds and commits entries for one chain.
///
/// The builder holds no chain state of its own: the tail lives in the store,
/// so any number of builders (or threads sharing one builder) may submit to
/// the same store concurrently.
pub struct ChainBuilder {
    chain_id: ChainId,
    store: Arc<dyn LedgerStore>,
    engine: Arc<dyn HashEngine>,
    validators: Vec<Box<dyn EventValidator>>,
    options: BuilderOptions,
}

impl ChainBuilder {
    pub fn new(chain_id: ChainId, store: Arc<dyn LedgerStore>, engine: Arc<dyn HashEngine>) -> Self {
        Self {
            chain_id,
            store,
            engine,
            validators: Vec::new(),
            options: BuilderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuilderOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a domain validator.  Validators run in registration order after
    /// the built-in field checks.
    pub fn with_validator(mut self, validator: Box<dyn EventValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Check `event` and return its canonical details JSON.
    ///
    /// Runs before any state is touched, so a rejection never changes the
    /// ledger.
    pub fn validate(&self, event: &AuditEvent) -> LedgerResult<Vec<u8>> {
        if event.actor_id.is_empty() {
            return Err(LedgerError::Validation {
                reason: "actor_id must not be empty".to_string(),
            });
        }
        if event.action.is_empty() {
            return Err(LedgerError::Validation {
                reason: "action must not be empty".to_string(),
            });
        }

        let details_json = canonicalize_details(&event.details, &self.options.limits)?;

        for validator in &self.validators {
            validator.validate(event)?;
        }
        Ok(details_json)
    }

    /// Submit one event using the configured default deadline.
    ///
    /// # Errors
    ///
    /// - `Validation` if the event is malformed (no state change)
    /// - `StoreUnavailable` if the store fails or the deadline passes
    /// - `ConflictRetriesExhausted` if every attempt lost the tail race
    pub fn submit(&self, event: AuditEvent) -> LedgerResult<LedgerEntry> {
        let deadline = self.options.append_timeout.map(|t| Instant::now() + t);
        self.submit_inner(event, deadline)
    }

    /// Submit one event that must commit before `deadline`.
    pub fn submit_with_deadline(
        &self,
        event: AuditEvent,
        deadline: Instant,
    ) -> LedgerResult<LedgerEntry> {
        self.submit_inner(event, Some(deadline))
    }

    fn submit_inner(
        &self,
        event: AuditEvent,
        deadline: Option<Instant>,
    ) -> LedgerResult<LedgerEntry> {
        let details_json = self.validate(&event).inspect_err(|e| {
            debug!(chain_id = %self.chain_id, action = %event.action, error = %e, "event rejected");
        })?;

        // Linkage fields are filled in per attempt.
        let mut entry = LedgerEntry::from_event(0, event, Digest::GENESIS, Digest::GENESIS);

        for attempt in 1..=self.options.max_retries {
            ensure_before(deadline)?;

            let tail = self.store.tail()?;
            entry.sequence = tail.next_sequence;
            entry.previous_hash = tail.tail_hash;
            entry.hash = self
                .engine
                .compute_hash(&HashInput::for_entry(&entry).encode_with(&details_json));

            match self.store.append(&entry, deadline) {
                Ok(sequence) => {
                    debug!(
                        chain_id = %self.chain_id,
                        sequence,
                        hash = %entry.hash,
                        attempt,
                        "entry committed"
                    );
                    return Ok(entry);
                }
                Err(LedgerError::SequenceConflict { expected, attempted }) => {
                    debug!(
                        chain_id = %self.chain_id,
                        expected,
                        attempted,
                        attempt,
                        "lost tail race, rebuilding entry"
                    );
                }
                Err(e) => {
                    warn!(
                        chain_id = %self.chain_id,
                        sequence = entry.sequence,
                        error = %e,
                        "append failed"
                    );
                    return Err(e);
                }
            }
        }

        warn!(
            chain_id = %self.chain_id,
            attempts = self.options.max_retries,
            "submission abandoned after repeated sequence conflicts"
        );
        Err(LedgerError::ConflictRetriesExhausted {
            attempts: self.options.max_retries,
        })
    }
}
