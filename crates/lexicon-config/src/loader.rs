//! Loading and validating a `LedgerConfig`.
//!
//! Parsing only checks the document's shape.  `validate` then rejects
//! settings that parse but cannot produce a working ledger; both loaders
//! call it, so a config returned from them is ready to use.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use lexicon_contracts::error::{LedgerError, LedgerResult};
use lexicon_core::{builder::BuilderOptions, canonical::CanonicalLimits};

use crate::config::{LedgerConfig, StorageBackend};

impl LedgerConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `LedgerError::Config` if the TOML is malformed, does not match
    /// the `LedgerConfig` schema, or fails `validate`.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = toml::from_str(s).map_err(|e| LedgerError::Config {
            reason: format!("failed to parse ledger TOML: {}", e),
        })?;
        config.validate()?;

        debug!(
            chain_id = %config.chain_id,
            backend = ?config.storage.backend,
            schemas = config.schemas.len(),
            "ledger config loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML ledger configuration.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject settings that cannot produce a working ledger.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.chain_id.as_str().trim().is_empty() {
            return Err(config_error("chain_id must not be empty"));
        }
        if self.builder.max_retries == 0 {
            return Err(config_error("builder.max_retries must be at least 1"));
        }
        if self.limits.max_details_depth == 0 {
            return Err(config_error("limits.max_details_depth must be at least 1"));
        }
        // "{}" is the smallest canonical details document.
        if self.limits.max_details_bytes < 2 {
            return Err(config_error("limits.max_details_bytes must be at least 2"));
        }
        if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
            return Err(config_error("storage.path is required when backend = \"file\""));
        }

        let mut seen = HashSet::new();
        for schema in &self.schemas {
            if !seen.insert(schema.action.as_str()) {
                return Err(config_error(&format!(
                    "more than one schema declared for action '{}'",
                    schema.action
                )));
            }
        }
        Ok(())
    }

    /// The `ChainBuilder` options described by `[builder]` and `[limits]`.
    pub fn builder_options(&self) -> BuilderOptions {
        BuilderOptions {
            max_retries: self.builder.max_retries,
            append_timeout: self.builder.append_timeout_ms.map(Duration::from_millis),
            limits: CanonicalLimits {
                max_depth: self.limits.max_details_depth,
                max_details_bytes: self.limits.max_details_bytes,
            },
        }
    }
}

fn config_error(reason: &str) -> LedgerError {
    LedgerError::Config {
        reason: reason.to_string(),
    }
}
