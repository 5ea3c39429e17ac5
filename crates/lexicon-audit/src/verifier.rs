//! Chain integrity verification.
//!
//! For every entry in the verified window, in ascending order:
//!
//! 1. **Linkage**: the stored `previous_hash` must equal the hash carried
//!    forward from the preceding entry (or the anchor for the first entry of
//!    the window).  A failure means an entry was inserted, deleted or
//!    reordered.
//! 2. **Content**: the hash recomputed from the entry's stored fields must
//!    equal its stored `hash`.  A failure means the entry was altered in
//!    place.
//!
//! Linkage is checked first: after a deletion the entry that moved into the
//! gap also fails the content check (its hash covers its old sequence), and
//! the linkage failure is the one that describes what happened.
//!
//! Verification stops at the first failure and never writes to the store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use lexicon_contracts::{
    chain::ChainId,
    entry::{Checkpoint, Digest, LedgerEntry, LedgerExport},
    error::{LedgerError, LedgerResult},
    verify::{FailureKind, IntegrityViolation, SequenceRange, VerificationResult},
};
use lexicon_core::{
    hash::recompute_hash,
    traits::{HashEngine, LedgerStore},
};

/// Verify a contiguous run of entries that starts at position `start`.
///
/// `anchor` is the hash the first entry must link to: `Digest::GENESIS` when
/// `start == 0`, otherwise the stored hash of entry `start - 1`.
pub fn verify_entries(
    engine: &dyn HashEngine,
    start: u64,
    anchor: Digest,
    entries: &[LedgerEntry],
) -> VerificationResult {
    let mut carried = anchor;

    for (offset, entry) in entries.iter().enumerate() {
        let position = start + offset as u64;

        if entry.previous_hash != carried {
            return VerificationResult::Broken(IntegrityViolation {
                sequence: position,
                kind: FailureKind::LinkageMismatch,
                expected: carried,
                actual: entry.previous_hash,
            });
        }

        let recomputed = recompute_hash(engine, entry);
        if recomputed != entry.hash {
            return VerificationResult::Broken(IntegrityViolation {
                sequence: position,
                kind: FailureKind::ContentMismatch,
                expected: recomputed,
                actual: entry.hash,
            });
        }

        carried = entry.hash;
    }

    VerificationResult::Intact {
        start,
        entries_checked: entries.len() as u64,
        final_hash: carried,
    }
}

/// Verify a sealed export offline, including its `terminal_hash`.
///
/// # Errors
///
/// - `Validation` if the export was hashed with a different algorithm than
///   `engine`
pub fn verify_export(
    engine: &dyn HashEngine,
    export: &LedgerExport,
) -> LedgerResult<VerificationResult> {
    if export.hash_algorithm != engine.algorithm() {
        return Err(LedgerError::Validation {
            reason: format!(
                "export of '{}' was hashed with '{}', verifier uses '{}'",
                export.chain_id,
                export.hash_algorithm,
                engine.algorithm()
            ),
        });
    }

    let result = verify_entries(engine, 0, Digest::GENESIS, &export.entries);
    Ok(match result.final_hash() {
        Some(final_hash) if final_hash != export.terminal_hash => {
            VerificationResult::Broken(IntegrityViolation {
                sequence: export.entries.len().saturating_sub(1) as u64,
                kind: FailureKind::CheckpointMismatch,
                expected: export.terminal_hash,
                actual: final_hash,
            })
        }
        _ => result,
    })
}

/// Walks a stored chain and reports the first divergence.
///
/// Holds only read access: it may run at any time, concurrently with new
/// appends.  The window is fixed when `verify` is called, so entries
/// committed during the run are outside it.
pub struct IntegrityVerifier {
    chain_id: ChainId,
    store: Arc<dyn LedgerStore>,
    engine: Arc<dyn HashEngine>,
}

impl IntegrityVerifier {
    pub fn new(chain_id: ChainId, store: Arc<dyn LedgerStore>, engine: Arc<dyn HashEngine>) -> Self {
        Self {
            chain_id,
            store,
            engine,
        }
    }

    /// Verify the whole ledger.
    pub fn verify_all(&self) -> LedgerResult<VerificationResult> {
        self.verify(SequenceRange::all())
    }

    /// Verify the entries in `range`, clipped to the current length.
    ///
    /// A window starting exactly at the tail (including any window over an
    /// empty ledger) is trivially intact.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `range` starts beyond the tail
    /// - `StoreUnavailable` if the store cannot be read
    pub fn verify(&self, range: impl Into<SequenceRange>) -> LedgerResult<VerificationResult> {
        let range = range.into();
        let len = self.store.len()?;

        if range.start > len {
            return Err(LedgerError::NotFound {
                reason: format!(
                    "verification range {range} starts beyond the tail of '{}' ({len} entries)",
                    self.chain_id
                ),
            });
        }

        let anchor = self.anchor_for(range.start)?;
        let entries = match range.clip(len) {
            Some(window) => self.store.read(SequenceRange::new(window.start, window.end))?,
            None => Vec::new(),
        };

        let result = verify_entries(self.engine.as_ref(), range.start, anchor, &entries);
        self.report(&result);
        Ok(result)
    }

    /// Capture the current tail as a checkpoint for external anchoring.
    pub fn checkpoint(&self) -> LedgerResult<Checkpoint> {
        let tail = self.store.tail()?;
        let Some(sequence) = tail.next_sequence.checked_sub(1) else {
            return Err(LedgerError::NotFound {
                reason: format!("chain '{}' has no entries to checkpoint", self.chain_id),
            });
        };
        Ok(Checkpoint {
            chain_id: self.chain_id.clone(),
            sequence,
            hash: tail.tail_hash,
            taken_at: Utc::now(),
        })
    }

    /// Verify the prefix `0..=checkpoint.sequence` and compare its final hash
    /// with the anchored one.
    ///
    /// Detects truncation below the checkpoint and wholesale rewrites of the
    /// prefix, neither of which linkage checks can see on their own.
    pub fn verify_checkpoint(&self, checkpoint: &Checkpoint) -> LedgerResult<VerificationResult> {
        if checkpoint.chain_id != self.chain_id {
            return Err(LedgerError::Validation {
                reason: format!(
                    "checkpoint belongs to chain '{}', not '{}'",
                    checkpoint.chain_id, self.chain_id
                ),
            });
        }

        let tail = self.store.tail()?;
        let result = if checkpoint.sequence >= tail.next_sequence {
            VerificationResult::Broken(IntegrityViolation {
                sequence: checkpoint.sequence,
                kind: FailureKind::CheckpointMismatch,
                expected: checkpoint.hash,
                actual: tail.tail_hash,
            })
        } else {
            let prefix = self.store.read(SequenceRange::new(0, checkpoint.sequence + 1))?;
            match verify_entries(self.engine.as_ref(), 0, Digest::GENESIS, &prefix) {
                VerificationResult::Intact { final_hash, .. } if final_hash != checkpoint.hash => {
                    VerificationResult::Broken(IntegrityViolation {
                        sequence: checkpoint.sequence,
                        kind: FailureKind::CheckpointMismatch,
                        expected: checkpoint.hash,
                        actual: final_hash,
                    })
                }
                other => other,
            }
        };

        self.report(&result);
        Ok(result)
    }

    fn anchor_for(&self, start: u64) -> LedgerResult<Digest> {
        let Some(prior) = start.checked_sub(1) else {
            return Ok(Digest::GENESIS);
        };
        self.store
            .get(prior)?
            .map(|e| e.hash)
            .ok_or_else(|| LedgerError::NotFound {
                reason: format!("entry {prior} of '{}' is missing", self.chain_id),
            })
    }

    fn report(&self, result: &VerificationResult) {
        match result {
            VerificationResult::Intact {
                start,
                entries_checked,
                final_hash,
            } => {
                if *entries_checked == 0 {
                    debug!(chain_id = %self.chain_id, start, "empty verification window");
                } else {
                    info!(
                        chain_id = %self.chain_id,
                        algorithm = self.engine.algorithm(),
                        start,
                        entries_checked,
                        final_hash = %final_hash,
                        "chain verified"
                    );
                }
            }
            VerificationResult::Broken(v) => {
                error!(
                    chain_id = %self.chain_id,
                    algorithm = self.engine.algorithm(),
                    sequence = v.sequence,
                    kind = %v.kind,
                    expected = %v.expected,
                    actual = %v.actual,
                    "chain integrity violation"
                );
            }
        }
    }
}
