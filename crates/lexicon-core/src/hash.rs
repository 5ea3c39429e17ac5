//! SHA-256 implementation of `HashEngine`.

use sha2::{Digest as _, Sha256};

use lexicon_contracts::entry::{Digest, LedgerEntry};

use crate::{canonical::HashInput, traits::HashEngine};

/// The default hash engine: SHA-256 over the canonical entry bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256HashEngine;

impl HashEngine for Sha256HashEngine {
    fn algorithm(&self) -> &'static str {
        "sha256"
    }

    fn compute_hash(&self, canonical_bytes: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(canonical_bytes);
        let mut bytes = [0u8; Digest::LEN];
        bytes.copy_from_slice(&hasher.finalize());
        Digest::from_bytes(bytes)
    }
}

/// Recompute the hash an entry should carry from its stored fields.
pub fn recompute_hash(engine: &dyn HashEngine, entry: &LedgerEntry) -> Digest {
    engine.compute_hash(&HashInput::for_entry(entry).encode())
}
