//! Read-only projections over a ledger for reporting collaborators.

use std::sync::Arc;

use lexicon_contracts::{
    entry::LedgerEntry,
    error::{LedgerError, LedgerResult},
    verify::SequenceRange,
};
use lexicon_core::traits::LedgerStore;

/// Read-only accessors over one chain.  There is no write path here.
pub struct QueryFacade {
    store: Arc<dyn LedgerStore>,
}

impl QueryFacade {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Entries in `range`, clipped to the ledger.
    ///
    /// Fails with `NotFound` only when the range lies entirely outside the
    /// ledger.
    pub fn by_range(&self, range: impl Into<SequenceRange>) -> LedgerResult<Vec<LedgerEntry>> {
        let range = range.into();
        let len = self.store.len()?;
        let Some(window) = range.clip(len) else {
            return Err(LedgerError::NotFound {
                reason: format!("range {range} is outside the ledger (0..{len})"),
            });
        };
        self.store.read(SequenceRange::new(window.start, window.end))
    }

    /// The entry at `sequence`.
    pub fn get(&self, sequence: u64) -> LedgerResult<LedgerEntry> {
        self.store
            .get(sequence)?
            .ok_or_else(|| LedgerError::NotFound {
                reason: format!("no entry at sequence {sequence}"),
            })
    }

    /// Every entry recorded for `actor_id`, oldest first.
    pub fn by_actor(&self, actor_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        self.filter(|e| e.actor_id == actor_id)
    }

    /// Every entry touching `resource_id`, oldest first.
    ///
    /// Corrections are recorded as new entries on the same resource, so this
    /// returns an object's full history.
    pub fn by_resource(&self, resource_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        self.filter(|e| e.resource_id == resource_id)
    }

    /// Like `by_resource`, restricted to one resource type.
    pub fn by_typed_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        self.filter(|e| e.resource_type == resource_type && e.resource_id == resource_id)
    }

    /// The last `n` entries, oldest first.
    pub fn latest(&self, n: u64) -> LedgerResult<Vec<LedgerEntry>> {
        let len = self.store.len()?;
        self.store
            .read(SequenceRange::starting_at(len.saturating_sub(n)))
    }

    fn filter(&self, keep: impl Fn(&LedgerEntry) -> bool) -> LedgerResult<Vec<LedgerEntry>> {
        let mut entries = self.store.read(SequenceRange::all())?;
        entries.retain(|e| keep(e));
        Ok(entries)
    }
}
