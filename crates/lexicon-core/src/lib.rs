//! # lexicon-core
//!
//! The chain-building core of the Lexicon audit ledger.
//!
//! This crate provides:
//! - The three seam traits (`HashEngine`, `LedgerStore`, `EventValidator`)
//! - The canonical byte encoding every entry hash is computed over
//! - `Sha256HashEngine`, the default `HashEngine`
//! - The `ChainBuilder` that validates, links and commits submitted events
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lexicon_core::{ChainBuilder, Sha256HashEngine};
//!
//! let builder = ChainBuilder::new(chain_id, store, Arc::new(Sha256HashEngine));
//! let entry = builder.submit(event)?;
//! ```

pub mod builder;
pub mod canonical;
pub mod hash;
pub mod traits;

pub use builder::{BuilderOptions, ChainBuilder};
pub use canonical::{CanonicalLimits, HashInput};
pub use hash::{recompute_hash, Sha256HashEngine};
pub use traits::{EventValidator, HashEngine, LedgerStore};
