//! The input record submitted to a ledger.
//!
//! An `AuditEvent` describes one sensitive action (an AI invocation, a
//! document access, a token transfer).  It carries no position and no hash;
//! both are assigned when the event is committed as a `LedgerEntry`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form event details.
///
/// A `BTreeMap` keeps top-level keys in lexicographic order; nested objects
/// are re-sorted during canonical encoding so submission order never changes
/// the hash.
pub type Details = BTreeMap<String, Value>;

/// A single action submitted for recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// The principal performing the action.  Must be non-empty.
    pub actor_id: String,

    /// Action tag, e.g. `"explanation_generated"`.  Must be non-empty.
    pub action: String,

    /// Kind of object affected.  Empty for global events.
    #[serde(default)]
    pub resource_type: String,

    /// Identifier of the object affected.  Empty for global events.
    #[serde(default)]
    pub resource_id: String,

    #[serde(default)]
    pub details: Details,

    /// Caller-clock time of the action.  Display only: it never takes part in
    /// ordering or hashing.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event with no resource and no details, stamped now.
    pub fn new(actor_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            action: action.into(),
            resource_type: String::new(),
            resource_id: String::new(),
            details: Details::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = resource_type.into();
        self.resource_id = resource_id.into();
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = at;
        self
    }
}
