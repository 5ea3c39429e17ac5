//! # lexicon-schema
//!
//! JSON Schema validation of audit event details.
//!
//! This crate provides [`DetailsSchemaValidator`], which implements the
//! [`lexicon_core::traits::EventValidator`] trait.  Register one schema per
//! action and hand the validator to a `ChainBuilder`; a submission whose
//! details do not match is rejected before it reaches the store.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use serde_json::json;
//! use lexicon_schema::DetailsSchemaValidator;
//!
//! let mut validator = DetailsSchemaValidator::new();
//! validator.register("document_deleted", &json!({
//!     "type": "object",
//!     "required": ["reason"],
//! }))?;
//! let builder = builder.with_validator(Box::new(validator));
//! ```

pub mod validator;

pub use validator::DetailsSchemaValidator;

// ── Tests ─────────────────────────────────────────────────────────────────────
