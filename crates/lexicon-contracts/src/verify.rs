//! Sequence ranges and chain verification results.
//!
//! A `VerificationResult` is either `Intact` (with the final hash reached,
//! for cross-checking against an anchored checkpoint) or `Broken` at the
//! first entry that failed.  A broken chain is a systemic problem that needs
//! operator escalation, so the result is `#[must_use]`.

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull};

use serde::{Deserialize, Serialize};

use crate::{
    entry::Digest,
    error::{LedgerError, LedgerResult},
};

// ── SequenceRange ─────────────────────────────────────────────────────────────

/// A half-open range of sequence numbers.  `end = None` means "to the tail".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl SequenceRange {
    /// The whole ledger.
    pub const fn all() -> Self {
        Self { start: 0, end: None }
    }

    pub const fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub const fn starting_at(start: u64) -> Self {
        Self { start, end: None }
    }

    /// Intersect with a ledger of `len` entries.
    ///
    /// Returns `None` when nothing of the range lies inside `0..len`.
    pub fn clip(&self, len: u64) -> Option<Range<u64>> {
        let end = self.end.map_or(len, |e| e.min(len));
        if self.start >= end {
            None
        } else {
            Some(self.start..end)
        }
    }
}

impl Default for SequenceRange {
    fn default() -> Self {
        Self::all()
    }
}

impl From<Range<u64>> for SequenceRange {
    fn from(r: Range<u64>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl From<RangeFrom<u64>> for SequenceRange {
    fn from(r: RangeFrom<u64>) -> Self {
        Self::starting_at(r.start)
    }
}

impl From<RangeFull> for SequenceRange {
    fn from(_: RangeFull) -> Self {
        Self::all()
    }
}

impl fmt::Display for SequenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}..{}", self.start, end),
            None => write!(f, "{}..", self.start),
        }
    }
}

// ── Violations ────────────────────────────────────────────────────────────────

/// Which check an entry failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The recomputed hash differs from the stored one: the entry itself was
    /// altered in place.
    ContentMismatch,
    /// The stored `previous_hash` differs from the prior entry's hash: an
    /// entry was inserted, deleted, or reordered.
    LinkageMismatch,
    /// The chain disagrees with an externally anchored checkpoint.
    CheckpointMismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ContentMismatch => "content-mismatch",
            Self::LinkageMismatch => "linkage-mismatch",
            Self::CheckpointMismatch => "checkpoint-mismatch",
        };
        f.write_str(s)
    }
}

/// The first broken link found by a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityViolation {
    /// Position in the chain where verification halted.
    pub sequence: u64,
    pub kind: FailureKind,
    /// The digest the verifier derived.
    pub expected: Digest,
    /// The digest found in storage.
    pub actual: Digest,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at sequence {}: expected {}, found {}",
            self.kind, self.sequence, self.expected, self.actual
        )
    }
}

// ── VerificationResult ────────────────────────────────────────────────────────

#[must_use = "a broken chain must be surfaced, not dropped"]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationResult {
    /// Every entry in the verified window passed both checks.
    Intact {
        /// First sequence verified.
        start: u64,
        /// Number of entries checked.  Zero for an empty window.
        entries_checked: u64,
        /// The hash carried forward past the last entry checked.
        final_hash: Digest,
    },
    /// Verification halted at the first failure.
    Broken(IntegrityViolation),
}

impl VerificationResult {
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact { .. })
    }

    pub fn violation(&self) -> Option<&IntegrityViolation> {
        match self {
            Self::Broken(v) => Some(v),
            Self::Intact { .. } => None,
        }
    }

    pub fn final_hash(&self) -> Option<Digest> {
        match self {
            Self::Intact { final_hash, .. } => Some(*final_hash),
            Self::Broken(_) => None,
        }
    }

    /// Escalate a broken chain into `LedgerError::IntegrityViolation`.
    ///
    /// Returns the final hash on success.
    pub fn into_result(self) -> LedgerResult<Digest> {
        match self {
            Self::Intact { final_hash, .. } => Ok(final_hash),
            Self::Broken(v) => Err(LedgerError::IntegrityViolation(v)),
        }
    }
}
