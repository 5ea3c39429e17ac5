//! # lexicon-contracts
//!
//! Shared types and error definitions for the Lexicon audit ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod chain;
pub mod entry;
pub mod error;
pub mod event;
pub mod verify;

pub use chain::{ChainId, ExportId};
pub use entry::{Checkpoint, Digest, LedgerEntry, LedgerExport, TailSnapshot};
pub use error::{LedgerError, LedgerResult};
pub use event::{AuditEvent, Details};
pub use verify::{FailureKind, IntegrityViolation, SequenceRange, VerificationResult};
