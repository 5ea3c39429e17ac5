//! Per-action JSON Schema checks on event `details`.
//!
//! `DetailsSchemaValidator` implements the `EventValidator` trait from
//! `lexicon-core`.  Each schema is compiled once, when it is registered.  At
//! submission time the event's `details` map is validated against the schema
//! registered for its `action`; events whose action has no schema pass
//! untouched.  Every violation is collected before returning so the caller
//! sees the full failure set in one error.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use lexicon_contracts::{
    error::{LedgerError, LedgerResult},
    event::AuditEvent,
};
use lexicon_core::traits::EventValidator;

pub struct DetailsSchemaValidator {
    schemas: HashMap<String, jsonschema::Validator>,
}

impl DetailsSchemaValidator {
    /// Create a validator with no schemas registered.
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Compile and register every `(action, schema)` pair.
    pub fn from_schemas<'a>(
        schemas: impl IntoIterator<Item = (&'a str, &'a Value)>,
    ) -> LedgerResult<Self> {
        let mut validator = Self::new();
        for (action, schema) in schemas {
            validator.register(action, schema)?;
        }
        Ok(validator)
    }

    /// Compile `schema` and use it for events whose action is `action`.
    ///
    /// Registering the same action twice replaces the previous schema.
    /// Returns `LedgerError::Config` if `schema` is not a valid JSON Schema
    /// document.
    pub fn register(&mut self, action: impl Into<String>, schema: &Value) -> LedgerResult<()> {
        let action = action.into();
        let compiled = jsonschema::validator_for(schema).map_err(|e| LedgerError::Config {
            reason: format!("invalid JSON Schema for action '{action}': {e}"),
        })?;
        debug!(action = %action, "details schema registered");
        self.schemas.insert(action, compiled);
        Ok(())
    }

    pub fn has_schema(&self, action: &str) -> bool {
        self.schemas.contains_key(action)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl Default for DetailsSchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventValidator for DetailsSchemaValidator {
    fn validate(&self, event: &AuditEvent) -> LedgerResult<()> {
        let Some(schema) = self.schemas.get(&event.action) else {
            return Ok(());
        };

        let details = Value::Object(
            event
                .details
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        );

        let violations: Vec<String> = schema
            .iter_errors(&details)
            .map(|error| format!("at '{}': {}", error.instance_path, error))
            .collect();

        if violations.is_empty() {
            return Ok(());
        }

        warn!(
            action = %event.action,
            actor_id = %event.actor_id,
            violations = violations.len(),
            "event details rejected by schema"
        );
        Err(LedgerError::Validation {
            reason: format!(
                "details for action '{}' violate its schema: {}",
                event.action,
                violations.join("; ")
            ),
        })
    }
}
