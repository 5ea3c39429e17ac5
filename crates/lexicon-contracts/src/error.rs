//! Error types for the Lexicon audit ledger.
//!
//! All fallible ledger operations return `LedgerResult<T>`.  Submission
//! errors are local to one call and never leave partial state behind.
//! Integrity violations are not raised by submissions; they are reported by
//! the verifier and only become an error when a caller escalates them.

use thiserror::Error;

use crate::verify::IntegrityViolation;

/// The unified error type for the ledger crates.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The submitted event is malformed.  The caller may fix and resubmit.
    #[error("invalid audit event: {reason}")]
    Validation { reason: String },

    /// Another writer committed at the sequence this append was built for.
    ///
    /// Raised by stores and retried by the chain builder; callers only see
    /// it wrapped as `ConflictRetriesExhausted`.
    #[error("sequence conflict: append built for sequence {attempted}, ledger is at {expected}")]
    SequenceConflict { expected: u64, attempted: u64 },

    /// The builder lost the tail race on every attempt it was allowed.
    #[error("sequence conflict persisted after {attempts} attempts")]
    ConflictRetriesExhausted { attempts: u32 },

    /// The underlying store could not accept or serve the request.
    ///
    /// No partial write is ever left behind, so the whole submission may be
    /// retried.
    #[error("ledger store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// A requested sequence or range lies entirely outside the ledger.
    #[error("not found: {reason}")]
    NotFound { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// A persisted log could not be decoded.
    #[error("ledger storage is corrupt: {reason}")]
    Corrupt { reason: String },

    /// The chain failed verification and the caller chose to escalate.
    #[error("integrity violation: {0}")]
    IntegrityViolation(IntegrityViolation),
}

impl LedgerError {
    /// True for failures the caller may retry without changing its input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::ConflictRetriesExhausted { .. }
        )
    }
}

/// Convenience alias used throughout the ledger crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
