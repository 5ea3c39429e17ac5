//! # lexicon-audit
//!
//! Append-only, SHA-256 hash-chained audit ledger.
//!
//! ## Overview
//!
//! Every submitted `AuditEvent` becomes a `LedgerEntry` that links to the
//! previous entry via its hash.  Altering any hashed field of any entry, or
//! removing or reordering entries, breaks the chain and is pinpointed by the
//! `IntegrityVerifier`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lexicon_audit::Ledger;
//! use lexicon_contracts::{AuditEvent, ChainId};
//!
//! let ledger = Ledger::in_memory(ChainId::new("tenant-acme"));
//! ledger.submit(AuditEvent::new("user-123", "document_deleted"))?;
//!
//! let result = ledger.verify_all()?;
//! assert!(result.is_intact());
//! ```

pub mod file;
pub mod ledger;
pub mod memory;
pub mod query;
pub mod verifier;

pub use file::FileLedgerStore;
pub use ledger::Ledger;
pub use memory::InMemoryLedgerStore;
pub use query::QueryFacade;
pub use verifier::{verify_entries, verify_export, IntegrityVerifier};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use serde_json::json;
    use sha2::{Digest as _, Sha256};

    use lexicon_contracts::{
        AuditEvent, ChainId, Digest, FailureKind, LedgerEntry, LedgerError, SequenceRange,
        VerificationResult,
    };
    use lexicon_core::{canonical::HashInput, Sha256HashEngine};

    use super::{verify_export, InMemoryLedgerStore, Ledger};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// A ledger plus a concrete handle on its store for tampering.
    fn ledger_with_store() -> (Ledger, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = Ledger::new(ChainId::new("test-chain"), store.clone());
        (ledger, store)
    }

    fn make_event(n: u64) -> AuditEvent {
        AuditEvent::new(format!("user-{}", n % 3), format!("action_{n}"))
            .with_resource("Document", format!("doc-{}", n % 2))
            .with_detail("n", n)
            .with_detail("meta", json!({ "tags": ["a", "b"], "score": 0.5 }))
    }

    /// Ledger with `n` entries built from `make_event`.
    fn populated(n: u64) -> (Ledger, Arc<InMemoryLedgerStore>) {
        let (ledger, store) = ledger_with_store();
        for i in 0..n {
            ledger.submit(make_event(i)).unwrap();
        }
        (ledger, store)
    }

    fn tamper(store: &InMemoryLedgerStore, f: impl FnOnce(&mut Vec<LedgerEntry>)) {
        f(&mut store.entries.write().unwrap());
    }

    fn expect_broken(result: VerificationResult, sequence: u64, kind: FailureKind) {
        match result {
            VerificationResult::Broken(v) => {
                assert_eq!(v.sequence, sequence, "wrong sequence in {v}");
                assert_eq!(v.kind, kind, "wrong kind in {v}");
            }
            other => panic!("expected Broken at {sequence}, got {:?}", other),
        }
    }

    // ── Serial chains ─────────────────────────────────────────────────────────

    /// The verifier's final hash equals a chain recomputed here directly with
    /// SHA-256 from the known event list.
    #[test]
    fn test_serial_chain_matches_independent_recomputation() {
        let events: Vec<AuditEvent> = (0..20).map(make_event).collect();
        let (ledger, _) = ledger_with_store();
        for event in &events {
            ledger.submit(event.clone()).unwrap();
        }

        let mut expected = Digest::GENESIS;
        for (seq, event) in events.iter().enumerate() {
            let bytes = HashInput::for_event(seq as u64, event, &expected).encode();
            let mut out = [0u8; 32];
            out.copy_from_slice(&Sha256::digest(&bytes));
            expected = Digest::from_bytes(out);
        }

        let result = ledger.verify_all().unwrap();
        assert!(result.is_intact(), "serial chain must verify: {:?}", result);
        assert_eq!(result.final_hash(), Some(expected));
    }

    /// Submitting A, B, C to an empty ledger yields sequences 0, 1, 2 linked
    /// from the genesis constant.
    #[test]
    fn test_three_event_scenario() {
        let (ledger, _) = ledger_with_store();
        let a = ledger.submit(AuditEvent::new("u1", "A")).unwrap();
        let b = ledger.submit(AuditEvent::new("u1", "B")).unwrap();
        let c = ledger.submit(AuditEvent::new("u1", "C")).unwrap();

        assert_eq!((a.sequence, b.sequence, c.sequence), (0, 1, 2));
        assert_eq!(a.previous_hash, Digest::GENESIS);
        assert_eq!(a.previous_hash.to_hex(), "0".repeat(64));
        assert_eq!(b.previous_hash, a.hash);

        let result = ledger.verify_all().unwrap();
        assert_eq!(result.final_hash(), Some(c.hash));
    }

    #[test]
    fn test_verify_is_idempotent() {
        let (ledger, _) = populated(6);
        let first = ledger.verify_all().unwrap();
        let second = ledger.verify_all().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_ledger_is_intact_at_genesis() {
        let (ledger, _) = ledger_with_store();
        let result = ledger.verify_all().unwrap();
        assert_eq!(
            result,
            VerificationResult::Intact {
                start: 0,
                entries_checked: 0,
                final_hash: Digest::GENESIS,
            }
        );
    }

    // ── Tamper detection ──────────────────────────────────────────────────────

    /// Mutating any hashed field of a stored entry is reported as a content
    /// mismatch at exactly that entry.
    #[test]
    fn test_every_hashed_field_is_tamper_evident() {
        let mutations: Vec<(&str, Box<dyn Fn(&mut LedgerEntry)>)> = vec![
            ("sequence", Box::new(|e: &mut LedgerEntry| e.sequence += 10)),
            ("actor_id", Box::new(|e: &mut LedgerEntry| e.actor_id.push('x'))),
            ("action", Box::new(|e: &mut LedgerEntry| e.action = "document_deleted".to_string())),
            ("resource_type", Box::new(|e: &mut LedgerEntry| e.resource_type.clear())),
            ("resource_id", Box::new(|e: &mut LedgerEntry| e.resource_id = "doc-99".to_string())),
            ("details", Box::new(|e: &mut LedgerEntry| {
                e.details.insert("n".to_string(), json!(1_000));
            })),
            ("nested details", Box::new(|e: &mut LedgerEntry| {
                e.details.insert("meta".to_string(), json!({ "tags": ["b", "a"], "score": 0.5 }));
            })),
        ];

        for (field, mutate) in mutations {
            let (ledger, store) = populated(5);
            tamper(&store, |entries| mutate(&mut entries[3]));

            let result = ledger.verify_all().unwrap();
            match &result {
                VerificationResult::Broken(v) => {
                    assert_eq!(v.sequence, 3, "field {field}");
                    assert_eq!(v.kind, FailureKind::ContentMismatch, "field {field}");
                }
                other => panic!("tampering {field} went undetected: {:?}", other),
            }
        }
    }

    /// Flipping one byte of entry 2's action in a 5-entry ledger halts at 2,
    /// and the untouched prefix still verifies on its own.
    #[test]
    fn test_flipped_byte_halts_at_that_entry() {
        let (ledger, store) = populated(5);
        tamper(&store, |entries| {
            let mut bytes = entries[2].action.clone().into_bytes();
            bytes[0] ^= 0x01;
            entries[2].action = String::from_utf8(bytes).unwrap();
        });

        expect_broken(ledger.verify_all().unwrap(), 2, FailureKind::ContentMismatch);
        assert!(ledger.verify(0..2u64).unwrap().is_intact());
    }

    #[test]
    fn test_occurred_at_is_not_tamper_evident() {
        let (ledger, store) = populated(3);
        tamper(&store, |entries| {
            entries[1].occurred_at = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
        });
        assert!(ledger.verify_all().unwrap().is_intact());
    }

    /// Rewriting an entry and recomputing its hash moves the failure to the
    /// next entry's linkage.
    #[test]
    fn test_rehashed_entry_breaks_linkage_of_successor() {
        let (ledger, store) = populated(5);
        tamper(&store, |entries| {
            entries[2].actor_id = "intruder".to_string();
            entries[2].hash = lexicon_core::recompute_hash(&Sha256HashEngine, &entries[2]);
        });
        expect_broken(ledger.verify_all().unwrap(), 3, FailureKind::LinkageMismatch);
    }

    #[test]
    fn test_deleted_entry_is_linkage_mismatch() {
        let (ledger, store) = populated(5);
        tamper(&store, |entries| {
            entries.remove(2);
        });
        expect_broken(ledger.verify_all().unwrap(), 2, FailureKind::LinkageMismatch);
    }

    #[test]
    fn test_swapped_entries_are_linkage_mismatch() {
        let (ledger, store) = populated(5);
        tamper(&store, |entries| entries.swap(1, 3));
        expect_broken(ledger.verify_all().unwrap(), 1, FailureKind::LinkageMismatch);
    }

    #[test]
    fn test_deleted_genesis_entry_is_linkage_mismatch() {
        let (ledger, store) = populated(3);
        tamper(&store, |entries| {
            entries.remove(0);
        });
        expect_broken(ledger.verify_all().unwrap(), 0, FailureKind::LinkageMismatch);
    }

    // ── Windows and checkpoints ───────────────────────────────────────────────

    /// A window anchors on the stored hash of the entry before it, so damage
    /// outside the window does not affect the result.
    #[test]
    fn test_windowed_verification() {
        let (ledger, store) = populated(6);
        let intact = ledger.verify(2..5u64).unwrap();
        assert_eq!(
            intact,
            VerificationResult::Intact {
                start: 2,
                entries_checked: 3,
                final_hash: store.entries.read().unwrap()[4].hash,
            }
        );

        tamper(&store, |entries| entries[0].action = "forged".to_string());
        assert!(ledger.verify(SequenceRange::starting_at(1)).unwrap().is_intact());
        expect_broken(ledger.verify(..).unwrap(), 0, FailureKind::ContentMismatch);
    }

    #[test]
    fn test_window_beyond_tail_is_not_found() {
        let (ledger, _) = populated(3);
        assert!(ledger.verify(3u64..).unwrap().is_intact());
        let err = ledger.verify(4..10u64).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    /// Truncating the tail leaves a chain that is internally consistent; only
    /// an anchored checkpoint reveals it.
    #[test]
    fn test_checkpoint_detects_truncation() {
        let (ledger, store) = populated(5);
        let checkpoint = ledger.checkpoint().unwrap();
        assert_eq!(checkpoint.sequence, 4);
        assert!(ledger.verify_checkpoint(&checkpoint).unwrap().is_intact());

        tamper(&store, |entries| {
            entries.pop();
        });

        assert!(ledger.verify_all().unwrap().is_intact());
        expect_broken(
            ledger.verify_checkpoint(&checkpoint).unwrap(),
            4,
            FailureKind::CheckpointMismatch,
        );
    }

    #[test]
    fn test_checkpoint_on_empty_ledger_is_not_found() {
        let (ledger, _) = ledger_with_store();
        assert!(matches!(
            ledger.checkpoint().unwrap_err(),
            LedgerError::NotFound { .. }
        ));
    }

    #[test]
    fn test_checkpoint_from_other_chain_is_rejected() {
        let (ledger, _) = populated(2);
        let other = Ledger::in_memory(ChainId::new("other"));
        other.submit(make_event(0)).unwrap();
        let foreign = other.checkpoint().unwrap();

        assert!(matches!(
            ledger.verify_checkpoint(&foreign).unwrap_err(),
            LedgerError::Validation { .. }
        ));
    }

    #[test]
    fn test_export_verifies_offline() {
        let (ledger, _) = populated(4);
        let export = ledger.export().unwrap();
        assert_eq!(export.entries.len(), 4);
        assert_eq!(export.terminal_hash, export.entries[3].hash);
        assert_eq!(export.hash_algorithm, "sha256");
        assert!(verify_export(&Sha256HashEngine, &export).unwrap().is_intact());

        let mut forged = export.clone();
        forged.entries.pop();
        expect_broken(
            verify_export(&Sha256HashEngine, &forged).unwrap(),
            2,
            FailureKind::CheckpointMismatch,
        );
    }

    #[test]
    fn test_export_from_other_hash_algorithm_is_rejected() {
        let (ledger, _) = populated(2);
        let mut export = ledger.export().unwrap();
        export.hash_algorithm = "blake3".to_string();

        let err = verify_export(&Sha256HashEngine, &export).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
        assert!(err.to_string().contains("blake3"));
    }

    // ── Concurrency ───────────────────────────────────────────────────────────

    /// Concurrent writers produce exactly one entry per submission, with
    /// sequences 0..M-1 and a chain that verifies.
    #[test]
    fn test_concurrent_submissions_keep_chain_dense() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 6;

        let (ledger, _) = ledger_with_store();
        thread::scope(|s| {
            for t in 0..THREADS {
                let ledger = &ledger;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        ledger.submit(make_event(t * 100 + i)).unwrap();
                    }
                });
            }
        });

        let entries = ledger.query().by_range(..).unwrap();
        assert_eq!(entries.len() as u64, THREADS * PER_THREAD);
        for (idx, entry) in entries.iter().enumerate() {
            assert_eq!(entry.sequence, idx as u64);
        }
        assert!(ledger.verify_all().unwrap().is_intact());
    }

    /// A verifier over a fixed window is unaffected by appends racing it.
    #[test]
    fn test_verification_runs_alongside_writers() {
        let (ledger, _) = populated(10);
        thread::scope(|s| {
            s.spawn(|| {
                for i in 10..40 {
                    ledger.submit(make_event(i)).unwrap();
                }
            });
            for _ in 0..10 {
                let result = ledger.verify(0..10).unwrap();
                assert!(result.is_intact());
            }
        });
        assert_eq!(ledger.len().unwrap(), 40);
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    #[test]
    fn test_queries_by_actor_and_resource() {
        let (ledger, _) = populated(6);
        let query = ledger.query();

        let by_actor = query.by_actor("user-1").unwrap();
        assert_eq!(
            by_actor.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            vec![1, 4]
        );

        let by_resource = query.by_resource("doc-0").unwrap();
        assert_eq!(by_resource.len(), 3);
        assert!(query.by_typed_resource("Explanation", "doc-0").unwrap().is_empty());

        assert_eq!(query.latest(2).unwrap()[0].sequence, 4);
        assert_eq!(query.get(5).unwrap().action, "action_5");
    }

    #[test]
    fn test_range_query_clips_and_rejects_outside() {
        let (ledger, _) = populated(3);
        let query = ledger.query();

        assert_eq!(query.by_range(1..10u64).unwrap().len(), 2);
        assert!(matches!(
            query.by_range(3..5u64).unwrap_err(),
            LedgerError::NotFound { .. }
        ));
        assert!(matches!(query.get(7).unwrap_err(), LedgerError::NotFound { .. }));
    }

    // ── Durable chains ────────────────────────────────────────────────────────

    /// Editing the log file on disk is caught after the next open.
    #[test]
    fn test_file_ledger_detects_on_disk_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.jsonl");
        {
            let ledger = Ledger::open_file(ChainId::new("disk"), &path, false).unwrap();
            for i in 0..4 {
                ledger.submit(make_event(i)).unwrap();
            }
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.replacen("action_1", "action_9", 1)).unwrap();

        let reopened = Ledger::open_file(ChainId::new("disk"), &path, false).unwrap();
        expect_broken(reopened.verify_all().unwrap(), 1, FailureKind::ContentMismatch);
    }

    /// Five entries written to `chain.jsonl` in a fresh temp dir.
    fn file_ledger_lines() -> (tempfile::TempDir, std::path::PathBuf, Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.jsonl");
        {
            let ledger = Ledger::open_file(ChainId::new("disk"), &path, false).unwrap();
            for i in 0..5 {
                ledger.submit(make_event(i)).unwrap();
            }
        }
        let lines = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (dir, path, lines)
    }

    fn write_lines(path: &std::path::Path, lines: &[String]) {
        let mut contents = lines.join("\n");
        contents.push('\n');
        std::fs::write(path, contents).unwrap();
    }

    /// A line removed from the log still opens, and the gap is reported at
    /// the position it left behind.
    #[test]
    fn test_file_ledger_reports_deleted_line() {
        let (_dir, path, mut lines) = file_ledger_lines();
        lines.remove(2);
        write_lines(&path, &lines);

        let reopened = Ledger::open_file(ChainId::new("disk"), &path, false).unwrap();
        assert_eq!(reopened.len().unwrap(), 4);
        expect_broken(reopened.verify_all().unwrap(), 2, FailureKind::LinkageMismatch);
        assert!(reopened.verify(0..2u64).unwrap().is_intact());
    }

    #[test]
    fn test_file_ledger_reports_swapped_lines() {
        let (_dir, path, mut lines) = file_ledger_lines();
        lines.swap(1, 3);
        write_lines(&path, &lines);

        let reopened = Ledger::open_file(ChainId::new("disk"), &path, false).unwrap();
        expect_broken(reopened.verify_all().unwrap(), 1, FailureKind::LinkageMismatch);
    }
}
