//! In-memory walkthrough of the ledger's guarantees.
//!
//! Records three events on a fresh chain, verifies it, then shows how an
//! edited entry and a truncated export are pinpointed.

use lexicon_audit::{verify_export, Ledger};
use lexicon_contracts::{
    chain::ChainId,
    error::LedgerResult,
    event::AuditEvent,
    verify::VerificationResult,
};
use lexicon_core::Sha256HashEngine;

pub fn run() -> LedgerResult<()> {
    println!();
    println!("Lexicon: tamper-evident audit ledger");
    println!("====================================");
    println!();

    let ledger = Ledger::in_memory(ChainId::new("demo"));

    // ── Step 1: three events ─────────────────────────────────────────────────

    println!("  Step 1: recording three events");
    let events = [
        AuditEvent::new("user-123", "document_uploaded")
            .with_resource("Document", "doc-7")
            .with_detail("bytes", 48_213),
        AuditEvent::new("user-123", "explanation_generated")
            .with_resource("Explanation", "exp-3")
            .with_detail("document_id", "doc-7"),
        AuditEvent::new("user-456", "document_deleted")
            .with_resource("Document", "doc-7")
            .with_detail("reason", "duplicate upload"),
    ];
    for event in events {
        let entry = ledger.submit(event)?;
        println!(
            "    #{} {:<22} prev={}… hash={}…",
            entry.sequence,
            entry.action,
            &entry.previous_hash.to_hex()[..12],
            &entry.hash.to_hex()[..12]
        );
    }
    println!();

    // ── Step 2: verification ─────────────────────────────────────────────────

    println!("  Step 2: verifying the chain");
    describe(&ledger.verify_all()?);
    println!(
        "    History of doc-7:      {} entr(ies)",
        ledger.query().by_resource("doc-7")?.len()
    );
    println!();

    // ── Step 3: tampering with an export ─────────────────────────────────────

    let export = ledger.export()?;
    println!("  Step 3: editing entry 1 of an exported copy");
    let mut edited = export.clone();
    edited.entries[1].actor_id = "user-999".to_string();
    describe(&verify_export(&Sha256HashEngine, &edited)?);
    println!();

    println!("  Step 4: dropping the last entry of an exported copy");
    let mut truncated = export;
    truncated.entries.pop();
    describe(&verify_export(&Sha256HashEngine, &truncated)?);
    println!();

    Ok(())
}

fn describe(result: &VerificationResult) {
    match result {
        VerificationResult::Intact {
            entries_checked,
            final_hash,
            ..
        } => {
            println!("    Chain integrity:       VERIFIED ({} entries)", entries_checked);
            println!("    Final hash:            {}", final_hash);
        }
        VerificationResult::Broken(violation) => {
            println!("    Chain integrity:       BROKEN");
            println!("    First failure:         {} at sequence {}", violation.kind, violation.sequence);
        }
    }
}
