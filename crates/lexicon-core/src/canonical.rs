//! Canonical byte encoding of ledger entries (`lexicon-ledger/v1`).
//!
//! Every field that contributes to an entry's hash is listed here, in order,
//! so nothing is accidentally omitted and an independent implementation can
//! reproduce the digest byte for byte.
//!
//! Hash input layout (bytes, in order):
//!   1. the domain tag `lexicon-ledger/v1` followed by one `0x00` byte
//!   2. `sequence` as 8-byte little-endian
//!   3. `actor_id`, `action`, `resource_type`, `resource_id`, each as an
//!      8-byte little-endian byte length followed by its UTF-8 bytes
//!   4. `details` as an 8-byte little-endian length followed by its
//!      canonical JSON
//!   5. `previous_hash` as 32 raw bytes
//!
//! Canonical JSON:
//!   - objects: keys sorted by their UTF-8 bytes, `{"k":v,...}`, no spaces
//!   - arrays: `[a,b,...]`, element order preserved
//!   - strings: `"` and `\` escaped with a backslash; `\b \f \n \r \t` for
//!     those control characters; any other byte below `0x20` as `\u00xx`
//!     (lowercase hex); everything else emitted as raw UTF-8
//!   - numbers: as `serde_json::Number` displays them.  Integers are plain
//!     decimal; floats use the shortest representation that round-trips, so
//!     `1` and `1.0` are different values
//!   - `true`, `false`, `null` literally
//!
//! `occurred_at` and `signature` are never part of the input.

use serde_json::Value;

use lexicon_contracts::{
    entry::{Digest, LedgerEntry},
    error::{LedgerError, LedgerResult},
    event::{AuditEvent, Details},
};

/// Domain separation tag prefixed to every hash input.
pub const DOMAIN_TAG: &[u8] = b"lexicon-ledger/v1\0";

/// Bounds applied to `details` at submission time.
///
/// Entries that exceed them are rejected before hashing; the bounds never
/// change the encoding itself, so verification does not consult them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalLimits {
    /// Maximum nesting depth.  The top-level details map is depth 1.
    pub max_depth: usize,
    /// Maximum size of the canonical details JSON.
    pub max_details_bytes: usize,
}

impl Default for CanonicalLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_details_bytes: 64 * 1024,
        }
    }
}

/// Borrowed view of exactly the fields that are hashed.
#[derive(Debug, Clone, Copy)]
pub struct HashInput<'a> {
    pub sequence: u64,
    pub actor_id: &'a str,
    pub action: &'a str,
    pub resource_type: &'a str,
    pub resource_id: &'a str,
    pub details: &'a Details,
    pub previous_hash: &'a Digest,
}

impl<'a> HashInput<'a> {
    pub fn for_event(sequence: u64, event: &'a AuditEvent, previous_hash: &'a Digest) -> Self {
        Self {
            sequence,
            actor_id: &event.actor_id,
            action: &event.action,
            resource_type: &event.resource_type,
            resource_id: &event.resource_id,
            details: &event.details,
            previous_hash,
        }
    }

    pub fn for_entry(entry: &'a LedgerEntry) -> Self {
        Self {
            sequence: entry.sequence,
            actor_id: &entry.actor_id,
            action: &entry.action,
            resource_type: &entry.resource_type,
            resource_id: &entry.resource_id,
            details: &entry.details,
            previous_hash: &entry.previous_hash,
        }
    }

    /// Encode all fields, canonicalizing `details` on the way.
    pub fn encode(&self) -> Vec<u8> {
        self.encode_with(&encode_details(self.details))
    }

    /// Encode using details JSON that was already canonicalized by
    /// `encode_details`.
    pub fn encode_with(&self, details_json: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            DOMAIN_TAG.len()
                + 8 * 6
                + self.actor_id.len()
                + self.action.len()
                + self.resource_type.len()
                + self.resource_id.len()
                + details_json.len()
                + Digest::LEN,
        );
        out.extend_from_slice(DOMAIN_TAG);
        out.extend_from_slice(&self.sequence.to_le_bytes());
        write_field(&mut out, self.actor_id.as_bytes());
        write_field(&mut out, self.action.as_bytes());
        write_field(&mut out, self.resource_type.as_bytes());
        write_field(&mut out, self.resource_id.as_bytes());
        write_field(&mut out, details_json);
        out.extend_from_slice(self.previous_hash.as_bytes());
        out
    }
}

fn write_field(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
}

// ── Details ───────────────────────────────────────────────────────────────────

/// Canonical JSON of a details map.
pub fn encode_details(details: &Details) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(b'{');
    // BTreeMap<String, _> already iterates in UTF-8 byte order.
    for (i, (key, value)) in details.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        write_string(&mut out, key);
        out.push(b':');
        write_value(&mut out, value);
    }
    out.push(b'}');
    out
}

/// Check `details` against `limits` and return its canonical JSON.
pub fn canonicalize_details(details: &Details, limits: &CanonicalLimits) -> LedgerResult<Vec<u8>> {
    let depth = 1 + details.values().map(value_depth).max().unwrap_or(0);
    if depth > limits.max_depth {
        return Err(LedgerError::Validation {
            reason: format!(
                "details nest {depth} levels deep, limit is {}",
                limits.max_depth
            ),
        });
    }

    let encoded = encode_details(details);
    if encoded.len() > limits.max_details_bytes {
        return Err(LedgerError::Validation {
            reason: format!(
                "details encode to {} bytes, limit is {}",
                encoded.len(),
                limits.max_details_bytes
            ),
        });
    }
    Ok(encoded)
}

fn value_depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(value_depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(value_depth).max().unwrap_or(0),
        _ => 0,
    }
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // serde_json::Map may preserve insertion order depending on
            // features, so sort explicitly.
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push(b'{');
            for (i, (key, value)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(out, key);
                out.push(b':');
                write_value(out, value);
            }
            out.push(b'}');
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    out.push(b'"');
    for &b in s.as_bytes() {
        match b {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x00..=0x1f => {
                out.extend_from_slice(b"\\u00");
                out.push(HEX[usize::from(b >> 4)]);
                out.push(HEX[usize::from(b & 0x0f)]);
            }
            _ => out.push(b),
        }
    }
    out.push(b'"');
}
