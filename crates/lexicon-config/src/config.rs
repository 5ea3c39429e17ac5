//! Configuration schema for a ledger deployment.
//!
//! Every field has a default, so an empty document yields an in-memory
//! ledger on the `"default"` chain with the stock builder limits.
//!
//! Example:
//! ```toml
//! chain_id = "tenant-acme"
//!
//! [builder]
//! max_retries = 32
//! append_timeout_ms = 250
//!
//! [limits]
//! max_details_depth = 16
//! max_details_bytes = 8192
//!
//! [storage]
//! backend = "file"
//! path = "/var/lib/lexicon/acme.jsonl"
//! sync_on_append = true
//!
//! [[schemas]]
//! action = "document_deleted"
//! schema = { type = "object", required = ["reason"] }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use lexicon_contracts::chain::ChainId;

/// Where committed entries live.
///
/// Expressed in TOML as a kebab-case string:
/// ```toml
/// backend = "memory"
/// backend = "file"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderSection {
    /// Attempts per submission before a sequence conflict is surfaced.
    pub max_retries: u32,

    /// Deadline applied to every `submit`, in milliseconds.  Unset means
    /// submissions wait for the store indefinitely.
    pub append_timeout_ms: Option<u64>,
}

impl Default for BuilderSection {
    fn default() -> Self {
        Self {
            max_retries: 64,
            append_timeout_ms: None,
        }
    }
}

/// Bounds on the `details` payload of a submitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub max_details_depth: usize,
    pub max_details_bytes: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_details_depth: 32,
            max_details_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,

    /// JSON Lines log file.  Required when `backend = "file"`.
    pub path: Option<PathBuf>,

    /// `fsync` the log after every append.
    pub sync_on_append: bool,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: None,
            sync_on_append: true,
        }
    }
}

/// A JSON Schema that `details` must satisfy for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailsSchema {
    /// The `AuditEvent::action` this schema applies to.
    pub action: String,

    /// JSON Schema document, written inline as a TOML table.
    pub schema: serde_json::Value,
}

/// The top-level structure deserialized from a TOML ledger config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub chain_id: ChainId,
    pub builder: BuilderSection,
    pub limits: LimitsSection,
    pub storage: StorageSection,
    pub schemas: Vec<DetailsSchema>,
}
