//! Core trait definitions for the ledger pipeline.
//!
//! These three traits are the seams between the chain builder and its
//! collaborators:
//!
//! - `HashEngine`: pure digest function over canonical bytes
//! - `LedgerStore`: append-only, sequence-ordered storage that owns the tail
//! - `EventValidator`: optional domain checks run before anything is hashed
//!
//! The builder and the verifier depend only on these traits, never on a
//! particular storage medium.

use std::time::Instant;

use lexicon_contracts::{
    entry::{Digest, LedgerEntry, TailSnapshot},
    error::{LedgerError, LedgerResult},
    event::AuditEvent,
    verify::SequenceRange,
};

/// A collision-resistant hash over canonical entry bytes.
///
/// Implementations must be deterministic and stateless: the same input bytes
/// always yield the same digest, so an external auditor can re-verify a chain
/// with independent tooling.
pub trait HashEngine: Send + Sync {
    /// Short algorithm name recorded in logs and exports, e.g. `"sha256"`.
    fn algorithm(&self) -> &'static str;

    /// Digest `canonical_bytes`.  Never fails.
    fn compute_hash(&self, canonical_bytes: &[u8]) -> Digest;
}

/// Ordered, append-only storage for one chain.
///
/// # Atomicity
///
/// `append` is the only serialization point in the ledger.  It must commit
/// the entry only if, at the instant of commit, `entry.sequence` equals the
/// store's next sequence and `entry.previous_hash` equals its tail hash.
/// Otherwise it returns `LedgerError::SequenceConflict` and changes nothing.
/// A commit is all-or-nothing: a failed append leaves no partial entry.
///
/// # Visibility
///
/// Once `append` returns `Ok`, the entry is visible to every later `read`.
/// Reads never observe a partially written entry.
pub trait LedgerStore: Send + Sync {
    /// Commit `entry` at the tail and return its sequence.
    ///
    /// When `deadline` is set and passes before the store can commit, the
    /// append fails with `LedgerError::StoreUnavailable` and the ledger is
    /// unchanged.
    fn append(&self, entry: &LedgerEntry, deadline: Option<Instant>) -> LedgerResult<u64>;

    /// Return committed entries in ascending sequence order.
    ///
    /// Only the portion of `range` inside the ledger is returned; a range
    /// entirely outside yields an empty vector.
    fn read(&self, range: SequenceRange) -> LedgerResult<Vec<LedgerEntry>>;

    /// Observe the next sequence and tail hash together.
    fn tail(&self) -> LedgerResult<TailSnapshot>;

    fn tail_hash(&self) -> LedgerResult<Digest> {
        Ok(self.tail()?.tail_hash)
    }

    /// Number of committed entries.
    fn len(&self) -> LedgerResult<u64> {
        Ok(self.tail()?.next_sequence)
    }

    fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Fetch the single entry at `sequence`, if committed.
    fn get(&self, sequence: u64) -> LedgerResult<Option<LedgerEntry>> {
        let end = sequence.saturating_add(1);
        Ok(self.read(SequenceRange::new(sequence, end))?.pop())
    }
}

/// A domain check applied to every event before it is hashed.
///
/// Validators run outside the critical section.  A rejection must be
/// reported as `LedgerError::Validation` and has no effect on the ledger.
pub trait EventValidator: Send + Sync {
    fn validate(&self, event: &AuditEvent) -> LedgerResult<()>;
}

/// Check that `entry` extends a ledger whose tail is `tail`.
///
/// Stores call this under their write lock, immediately before committing.
pub fn ensure_extends(tail: &TailSnapshot, entry: &LedgerEntry) -> LedgerResult<()> {
    if entry.sequence != tail.next_sequence {
        return Err(LedgerError::SequenceConflict {
            expected: tail.next_sequence,
            attempted: entry.sequence,
        });
    }
    if entry.previous_hash != tail.tail_hash {
        return Err(LedgerError::Validation {
            reason: format!(
                "entry {} links to {} but the tail hash is {}",
                entry.sequence, entry.previous_hash, tail.tail_hash
            ),
        });
    }
    Ok(())
}

/// Fail with `StoreUnavailable` once `deadline` has passed.
pub fn ensure_before(deadline: Option<Instant>) -> LedgerResult<()> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(LedgerError::StoreUnavailable {
            reason: "append deadline elapsed before commit".to_string(),
        }),
        _ => Ok(()),
    }
}
