//! # lexicon-config
//!
//! TOML configuration for a Lexicon ledger deployment.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use lexicon_config::LedgerConfig;
//!
//! let config = LedgerConfig::from_file(Path::new("ledger.toml"))?;
//! let options = config.builder_options();
//! ```
//!
//! A missing section or field falls back to its default.  Loading always
//! runs `LedgerConfig::validate`.

pub mod config;
pub mod loader;

pub use config::{
    BuilderSection, DetailsSchema, LedgerConfig, LimitsSection, StorageBackend, StorageSection,
};

// ── Tests ─────────────────────────────────────────────────────────────────────
