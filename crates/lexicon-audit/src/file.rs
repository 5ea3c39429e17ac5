//! Durable JSON Lines implementation of `LedgerStore`.
//!
//! One `LedgerEntry` per line, in sequence order.  On open, the whole file
//! is decoded to recover the entries, the next sequence and the tail hash,
//! so a chain survives process restarts.  Committed entries are also kept in
//! memory and reads are served from there.
//!
//! Each append is a single `write_all` of one newline-terminated line.  A
//! crash mid-write can only leave an unterminated final line, which `open`
//! truncates away.  A failed write is rolled back to the previous file
//! length before the error is returned; if the rollback itself fails the
//! store refuses every later append.
//!
//! Lines are taken in file order and positioned `0..n` regardless of the
//! `sequence` they carry.  A deleted or reordered line therefore still
//! opens, and the verifier reports it as a linkage mismatch.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use lexicon_contracts::{
    entry::{LedgerEntry, TailSnapshot},
    error::{LedgerError, LedgerResult},
    verify::SequenceRange,
};
use lexicon_core::traits::{ensure_before, ensure_extends, LedgerStore};

use crate::memory::{acquire_read, acquire_write, slice_range, tail_of};

struct FileState {
    file: File,
    entries: Vec<LedgerEntry>,
    /// Length of the file covered by `entries`.
    committed_bytes: u64,
    /// Set when a partial append could not be rolled back.
    wedged: bool,
}

/// A ledger store backed by an append-only JSON Lines file.
pub struct FileLedgerStore {
    path: PathBuf,
    sync_on_append: bool,
    state: RwLock<FileState>,
}

impl FileLedgerStore {
    /// Open the log at `path`, creating it if missing.
    ///
    /// When `sync_on_append` is true every append is followed by
    /// `File::sync_data`, so an acknowledged entry survives power loss.
    ///
    /// # Errors
    ///
    /// - `StoreUnavailable` if the file cannot be opened, read or repaired
    /// - `Corrupt` if a complete line does not decode
    pub fn open(path: impl AsRef<Path>, sync_on_append: bool) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| unavailable(&path, "open", &e))?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| unavailable(&path, "read", &e))?;

        let (entries, committed_bytes) = decode_log(&path, &contents)?;

        if committed_bytes < contents.len() as u64 {
            warn!(
                path = %path.display(),
                discarded_bytes = contents.len() as u64 - committed_bytes,
                "truncating torn final line"
            );
            file.set_len(committed_bytes)
                .map_err(|e| unavailable(&path, "truncate", &e))?;
        }

        let tail = tail_of(&entries);
        info!(
            path = %path.display(),
            entries = tail.next_sequence,
            tail_hash = %tail.tail_hash,
            "ledger file opened"
        );

        Ok(Self {
            path,
            sync_on_append,
            state: RwLock::new(FileState {
                file,
                entries,
                committed_bytes,
                wedged: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decode every newline-terminated line of `contents`.
///
/// Returns the entries and the byte length they cover.  A trailing segment
/// without a newline is left out of that length so the caller can drop it.
fn decode_log(path: &Path, contents: &[u8]) -> LedgerResult<(Vec<LedgerEntry>, u64)> {
    let mut entries: Vec<LedgerEntry> = Vec::new();
    let mut offset = 0usize;

    while let Some(newline) = contents[offset..].iter().position(|&b| b == b'\n') {
        let line = &contents[offset..offset + newline];
        let line_no = entries.len() + 1;

        let entry: LedgerEntry = serde_json::from_slice(line).map_err(|e| LedgerError::Corrupt {
            reason: format!("{} line {line_no}: {e}", path.display()),
        })?;
        if entry.sequence != entries.len() as u64 {
            warn!(
                path = %path.display(),
                line = line_no,
                position = entries.len(),
                sequence = entry.sequence,
                "stored sequence does not match file position"
            );
        }

        entries.push(entry);
        offset += newline + 1;
    }

    Ok((entries, offset as u64))
}

fn unavailable(path: &Path, op: &str, e: &std::io::Error) -> LedgerError {
    LedgerError::StoreUnavailable {
        reason: format!("failed to {op} '{}': {e}", path.display()),
    }
}

impl LedgerStore for FileLedgerStore {
    fn append(&self, entry: &LedgerEntry, deadline: Option<Instant>) -> LedgerResult<u64> {
        let mut line = serde_json::to_vec(entry).map_err(|e| LedgerError::Validation {
            reason: format!("entry {} cannot be serialized: {e}", entry.sequence),
        })?;
        line.push(b'\n');

        let mut guard = acquire_write(&self.state, deadline)?;
        let state = &mut *guard;
        if state.wedged {
            return Err(LedgerError::StoreUnavailable {
                reason: format!(
                    "'{}' holds an unrolled partial append; reopen the store to repair it",
                    self.path.display()
                ),
            });
        }
        ensure_extends(&tail_of(&state.entries), entry)?;
        ensure_before(deadline)?;

        let written = state.file.write_all(&line).and_then(|()| {
            state.file.flush()?;
            if self.sync_on_append {
                state.file.sync_data()?;
            }
            Ok(())
        });

        if let Err(e) = written {
            if let Err(rollback) = state.file.set_len(state.committed_bytes) {
                state.wedged = true;
                error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to roll back partial append"
                );
            }
            return Err(unavailable(&self.path, "append to", &e));
        }

        state.committed_bytes += line.len() as u64;
        state.entries.push(entry.clone());
        debug!(path = %self.path.display(), sequence = entry.sequence, "entry persisted");
        Ok(entry.sequence)
    }

    fn read(&self, range: SequenceRange) -> LedgerResult<Vec<LedgerEntry>> {
        let state = acquire_read(&self.state)?;
        Ok(slice_range(&state.entries, range))
    }

    fn tail(&self) -> LedgerResult<TailSnapshot> {
        let state = acquire_read(&self.state)?;
        Ok(tail_of(&state.entries))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use lexicon_contracts::{
        entry::Digest,
        event::AuditEvent,
        chain::ChainId,
    };
    use lexicon_core::{ChainBuilder, Sha256HashEngine};

    use super::*;

    fn builder_for(store: Arc<FileLedgerStore>) -> ChainBuilder {
        ChainBuilder::new(ChainId::new("file-test"), store, Arc::new(Sha256HashEngine))
    }

    #[test]
    fn reopen_recovers_tail_and_continues_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let first = {
            let store = Arc::new(FileLedgerStore::open(&path, true).unwrap());
            let builder = builder_for(store.clone());
            builder.submit(AuditEvent::new("u1", "A")).unwrap();
            builder.submit(AuditEvent::new("u1", "B")).unwrap()
        };

        let store = Arc::new(FileLedgerStore::open(&path, false).unwrap());
        let tail = store.tail().unwrap();
        assert_eq!(tail.next_sequence, 2);
        assert_eq!(tail.tail_hash, first.hash);

        let third = builder_for(store.clone())
            .submit(AuditEvent::new("u1", "C"))
            .unwrap();
        assert_eq!(third.sequence, 2);
        assert_eq!(third.previous_hash, first.hash);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    #[test]
    fn torn_final_line_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        {
            let store = Arc::new(FileLedgerStore::open(&path, false).unwrap());
            builder_for(store).submit(AuditEvent::new("u1", "A")).unwrap();
        }
        let intact_len = fs::metadata(&path).unwrap().len();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"sequence":1,"actor_id":"u"#).unwrap();
        drop(file);

        let store = FileLedgerStore::open(&path, false).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), intact_len);
    }

    #[test]
    fn undecodable_complete_line_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        fs::write(&path, b"not json\n").unwrap();

        let err = FileLedgerStore::open(&path, false).err().unwrap();
        assert!(matches!(err, LedgerError::Corrupt { .. }));
    }

    #[test]
    fn sequence_gap_on_disk_still_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let entry = LedgerEntry::from_event(
            1,
            AuditEvent::new("u1", "A"),
            Digest::GENESIS,
            Digest::GENESIS,
        );
        let mut line = serde_json::to_vec(&entry).unwrap();
        line.push(b'\n');
        fs::write(&path, line).unwrap();

        let store = FileLedgerStore::open(&path, false).unwrap();
        let tail = store.tail().unwrap();
        assert_eq!(tail.next_sequence, 1);
        assert_eq!(tail.tail_hash, Digest::GENESIS);
        assert_eq!(store.get(0).unwrap().map(|e| e.sequence), Some(1));
    }

    #[test]
    fn wedged_store_refuses_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let store = Arc::new(FileLedgerStore::open(&path, false).unwrap());
        builder_for(store.clone())
            .submit(AuditEvent::new("u1", "A"))
            .unwrap();
        let before = fs::metadata(&path).unwrap().len();

        store.state.write().unwrap().wedged = true;

        let err = builder_for(store.clone())
            .submit(AuditEvent::new("u1", "B"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::StoreUnavailable { .. }));
        assert_eq!(fs::metadata(&path).unwrap().len(), before);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn conflicting_append_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let store = Arc::new(FileLedgerStore::open(&path, false).unwrap());
        let committed = builder_for(store.clone())
            .submit(AuditEvent::new("u1", "A"))
            .unwrap();
        let before = fs::metadata(&path).unwrap().len();

        let err = store.append(&committed, None).unwrap_err();
        assert!(matches!(err, LedgerError::SequenceConflict { .. }));
        assert_eq!(fs::metadata(&path).unwrap().len(), before);
    }
}
