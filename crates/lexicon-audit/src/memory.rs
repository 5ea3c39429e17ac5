//! In-memory implementation of `LedgerStore`.
//!
//! `InMemoryLedgerStore` is the reference store.  It keeps all entries in a
//! `Vec` behind an `RwLock`: appends take the write lock only for the
//! compare-and-push, and readers take the read lock only long enough to
//! copy the requested range, so readers and writers never wait on each other
//! beyond a single append.
//!
//! Nothing survives a restart; use `FileLedgerStore` for a durable chain.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use std::thread;
use std::time::Instant;

use lexicon_contracts::{
    entry::{Digest, LedgerEntry, TailSnapshot},
    error::{LedgerError, LedgerResult},
    verify::SequenceRange,
};
use lexicon_core::traits::{ensure_before, ensure_extends, LedgerStore};

// ── Shared store helpers ──────────────────────────────────────────────────────

/// The tail of a ledger whose committed entries are `entries`.
pub(crate) fn tail_of(entries: &[LedgerEntry]) -> TailSnapshot {
    TailSnapshot {
        next_sequence: entries.len() as u64,
        tail_hash: entries.last().map_or(Digest::GENESIS, |e| e.hash),
    }
}

/// Copy the in-bounds portion of `range` out of `entries`.
pub(crate) fn slice_range(entries: &[LedgerEntry], range: SequenceRange) -> Vec<LedgerEntry> {
    match range.clip(entries.len() as u64) {
        Some(r) => entries[r.start as usize..r.end as usize].to_vec(),
        None => Vec::new(),
    }
}

/// Take the write lock, giving up with `StoreUnavailable` at `deadline`.
pub(crate) fn acquire_write<T>(
    lock: &RwLock<T>,
    deadline: Option<Instant>,
) -> LedgerResult<RwLockWriteGuard<'_, T>> {
    let Some(deadline) = deadline else {
        return lock.write().map_err(|e| poisoned(&e));
    };

    loop {
        match lock.try_write() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(e)) => return Err(poisoned(&e)),
            Err(TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return Err(LedgerError::StoreUnavailable {
                        reason: "timed out waiting for the ledger write lock".to_string(),
                    });
                }
                thread::yield_now();
            }
        }
    }
}

pub(crate) fn acquire_read<T>(lock: &RwLock<T>) -> LedgerResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|e| poisoned(&e))
}

fn poisoned(e: &dyn std::fmt::Display) -> LedgerError {
    LedgerError::StoreUnavailable {
        reason: format!("ledger state lock poisoned: {e}"),
    }
}

// ── Public store ──────────────────────────────────────────────────────────────

/// A volatile, append-only ledger store.
///
/// # Thread safety
///
/// All methods take `&self`; share the store across threads with `Arc`.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    pub(crate) entries: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    /// Commit `entry` if it extends the current tail.
    ///
    /// The tail check, the deadline check, and the push all happen under one
    /// write-lock acquisition, so two appends can never both claim the same
    /// sequence.
    fn append(&self, entry: &LedgerEntry, deadline: Option<Instant>) -> LedgerResult<u64> {
        let mut entries = acquire_write(&self.entries, deadline)?;
        ensure_extends(&tail_of(&entries), entry)?;
        ensure_before(deadline)?;
        entries.push(entry.clone());
        Ok(entry.sequence)
    }

    fn read(&self, range: SequenceRange) -> LedgerResult<Vec<LedgerEntry>> {
        let entries = acquire_read(&self.entries)?;
        Ok(slice_range(&entries, range))
    }

    fn tail(&self) -> LedgerResult<TailSnapshot> {
        let entries = acquire_read(&self.entries)?;
        Ok(tail_of(&entries))
    }
}
