//! Committed ledger entries and the digest type that links them.
//!
//! A `LedgerEntry` is an `AuditEvent` plus its position in the chain, the
//! hash of its predecessor, and its own hash.  Modifying any hashed field
//! invalidates `hash`; removing or reordering entries breaks the
//! `previous_hash` linkage of the entry that follows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    chain::{ChainId, ExportId},
    error::{LedgerError, LedgerResult},
    event::{AuditEvent, Details},
};

// ── Digest ────────────────────────────────────────────────────────────────────

/// A fixed-length 256-bit content hash.
///
/// Serialized as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; Digest::LEN]);

impl Digest {
    /// Length of a digest in bytes.
    pub const LEN: usize = 32;

    /// The sentinel `previous_hash` of the entry at sequence 0.
    ///
    /// 32 zero bytes (64 `0` hex characters).
    pub const GENESIS: Digest = Digest([0u8; Digest::LEN]);

    pub const fn from_bytes(bytes: [u8; Digest::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Digest::LEN] {
        &self.0
    }

    pub fn is_genesis(&self) -> bool {
        *self == Self::GENESIS
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> LedgerResult<Self> {
        let mut bytes = [0u8; Digest::LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| LedgerError::Validation {
            reason: format!("invalid digest '{s}': {e}"),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(de::Error::custom)
    }
}

// ── LedgerEntry ───────────────────────────────────────────────────────────────

/// A committed, immutable entry in one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the chain.  0 for the first entry, +1 per commit.
    pub sequence: u64,

    pub actor_id: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub details: Details,

    /// Caller-supplied time, copied verbatim.  Not hashed.
    pub occurred_at: DateTime<Utc>,

    /// `hash` of the entry at `sequence - 1`, or `Digest::GENESIS`.
    pub previous_hash: Digest,

    /// Hash over the canonical encoding of every field above except
    /// `occurred_at`.
    pub hash: Digest,

    /// Opaque signature over `hash`, attached by an external signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl LedgerEntry {
    /// Assemble an entry from its originating event and computed linkage.
    pub fn from_event(
        sequence: u64,
        event: AuditEvent,
        previous_hash: Digest,
        hash: Digest,
    ) -> Self {
        Self {
            sequence,
            actor_id: event.actor_id,
            action: event.action,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            details: event.details,
            occurred_at: event.occurred_at,
            previous_hash,
            hash,
            signature: None,
        }
    }

    /// Rebuild the event this entry was committed from.
    pub fn to_event(&self) -> AuditEvent {
        AuditEvent {
            actor_id: self.actor_id.clone(),
            action: self.action.clone(),
            resource_type: self.resource_type.clone(),
            resource_id: self.resource_id.clone(),
            details: self.details.clone(),
            occurred_at: self.occurred_at,
        }
    }

    /// True if this entry directly follows `previous` in a chain.
    pub fn follows(&self, previous: &LedgerEntry) -> bool {
        previous.sequence.checked_add(1) == Some(self.sequence)
            && self.previous_hash == previous.hash
    }
}

// ── Tail, checkpoints and exports ─────────────────────────────────────────────

/// The point new entries link against, observed at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailSnapshot {
    /// Sequence the next committed entry will receive (equals the length).
    pub next_sequence: u64,
    /// `hash` of the last entry, or `Digest::GENESIS` for an empty ledger.
    pub tail_hash: Digest,
}

impl TailSnapshot {
    pub const EMPTY: TailSnapshot = TailSnapshot {
        next_sequence: 0,
        tail_hash: Digest::GENESIS,
    };
}

/// An externally anchored commitment to a chain prefix.
///
/// Publishing the tail hash somewhere the ledger operator cannot rewrite
/// lets a later verification detect truncation, which linkage checks alone
/// cannot see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub chain_id: ChainId,
    /// Sequence of the last entry covered.
    pub sequence: u64,
    /// `hash` of the entry at `sequence`.
    pub hash: Digest,
    pub taken_at: DateTime<Utc>,
}

/// A sealed snapshot of a chain.
///
/// `terminal_hash` is the `hash` of the last entry, or `Digest::GENESIS`
/// when the chain is empty, and is a compact commitment to every entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub export_id: ExportId,
    pub chain_id: ChainId,
    /// All entries in chain order (sequence 0 first).
    pub entries: Vec<LedgerEntry>,
    pub exported_at: DateTime<Utc>,
    pub terminal_hash: Digest,
    /// `HashEngine::algorithm` of the engine that produced the hashes.
    pub hash_algorithm: String,
}
