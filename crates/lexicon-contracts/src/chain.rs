//! Chain identity types.
//!
//! Every ledger instance belongs to exactly one logical chain (for example a
//! tenant).  Chains never share a genesis, a tail, or a sequence space.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, human-readable identifier for one logical chain.
///
/// Appears in log lines, checkpoints and exports so that an operator can
/// tell which chain a tail hash belongs to.
/// Example: ChainId("tenant-acme")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChainId {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a single exported snapshot of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportId(pub uuid::Uuid);

impl ExportId {
    /// Create a new, unique export ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExportId {
    fn default() -> Self {
        Self::new()
    }
}
