//! Lexicon ledger CLI
//!
//! Records audit events to a hash-chained ledger and verifies, queries and
//! exports it.  The ledger is described by a TOML config (`--config`); the
//! `--ledger` flag is a shortcut for a file-backed chain at the given path.
//!
//! Usage:
//!   cargo run -p lexicon-cli -- --ledger audit.jsonl submit --actor u1 --action login
//!   cargo run -p lexicon-cli -- --ledger audit.jsonl verify --from 10
//!   cargo run -p lexicon-cli -- --ledger audit.jsonl show --actor u1
//!   cargo run -p lexicon-cli -- demo

mod demo;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use lexicon_audit::{FileLedgerStore, InMemoryLedgerStore, Ledger};
use lexicon_config::{LedgerConfig, StorageBackend};
use lexicon_contracts::{
    chain::ChainId,
    entry::{Checkpoint, LedgerEntry},
    error::{LedgerError, LedgerResult},
    event::{AuditEvent, Details},
    verify::{SequenceRange, VerificationResult},
};
use lexicon_core::{traits::EventValidator, LedgerStore, Sha256HashEngine};
use lexicon_schema::DetailsSchemaValidator;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Lexicon: tamper-evident audit ledger.
#[derive(Parser)]
#[command(
    name = "lexicon-ledger",
    about = "Tamper-evident, hash-chained audit ledger",
    long_about = "Appends audit events to a SHA-256 hash chain and verifies,\n\
                  queries and exports it."
)]
struct Cli {
    /// TOML ledger configuration.  Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a file-backed chain at this path, overriding `[storage]`.
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Override the configured chain id.
    #[arg(long, global = true)]
    chain: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append one event to the chain and print the committed entry.
    Submit {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        action: String,
        #[arg(long, default_value = "")]
        resource_type: String,
        #[arg(long, default_value = "")]
        resource_id: String,
        /// Details as a JSON object.
        #[arg(long)]
        details: Option<String>,
    },
    /// Verify the whole chain, a window of it, or a stored checkpoint.
    Verify {
        #[arg(long, default_value_t = 0)]
        from: u64,
        /// Exclusive upper bound.
        #[arg(long)]
        to: Option<u64>,
        /// Verify against a checkpoint file written by `checkpoint`.
        #[arg(long, conflicts_with_all = ["from", "to"])]
        checkpoint: Option<PathBuf>,
    },
    /// Print the current tail as a checkpoint for external anchoring.
    Checkpoint {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print entries as JSON Lines.
    Show {
        #[arg(long, default_value_t = 0)]
        from: u64,
        #[arg(long)]
        to: Option<u64>,
        #[arg(long, conflicts_with = "resource")]
        actor: Option<String>,
        #[arg(long)]
        resource: Option<String>,
        /// Only the last N entries.
        #[arg(long, conflicts_with_all = ["from", "to", "actor", "resource"])]
        latest: Option<u64>,
    },
    /// Write every entry and the terminal hash as one JSON document.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the in-memory walkthrough: three events, then tampering.
    Demo,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Demo => demo::run(),
        ref command => load_config(&cli).and_then(|config| {
            let ledger = open_ledger(&config)?;
            run_command(&ledger, command)
        }),
    };

    if let Err(e) = result {
        eprintln!("lexicon-ledger: {}", e);
        std::process::exit(1);
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> LedgerResult<LedgerConfig> {
    let mut config = match &cli.config {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig::default(),
    };
    if let Some(path) = &cli.ledger {
        config.storage.backend = StorageBackend::File;
        config.storage.path = Some(path.clone());
    }
    if let Some(chain) = &cli.chain {
        config.chain_id = ChainId::new(chain.as_str());
    }
    config.validate()?;
    Ok(config)
}

/// Assemble the store, validators and builder options a config describes.
fn open_ledger(config: &LedgerConfig) -> LedgerResult<Ledger> {
    let store: Arc<dyn LedgerStore> = match (config.storage.backend, &config.storage.path) {
        (StorageBackend::File, Some(path)) => {
            Arc::new(FileLedgerStore::open(path, config.storage.sync_on_append)?)
        }
        (StorageBackend::File, None) => {
            return Err(LedgerError::Config {
                reason: "storage.path is required when backend = \"file\"".to_string(),
            })
        }
        (StorageBackend::Memory, _) => {
            warn!("in-memory ledger: entries are discarded when the process exits");
            Arc::new(InMemoryLedgerStore::new())
        }
    };

    let mut validators: Vec<Box<dyn EventValidator>> = Vec::new();
    if !config.schemas.is_empty() {
        let schemas = DetailsSchemaValidator::from_schemas(
            config.schemas.iter().map(|s| (s.action.as_str(), &s.schema)),
        )?;
        validators.push(Box::new(schemas));
    }

    Ok(Ledger::with_parts(
        config.chain_id.clone(),
        store,
        Arc::new(Sha256HashEngine),
        config.builder_options(),
        validators,
    ))
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_command(ledger: &Ledger, command: &Command) -> LedgerResult<()> {
    match command {
        Command::Submit {
            actor,
            action,
            resource_type,
            resource_id,
            details,
        } => {
            let mut event = AuditEvent::new(actor.as_str(), action.as_str())
                .with_resource(resource_type.as_str(), resource_id.as_str());
            if let Some(raw) = details {
                event.details = serde_json::from_str::<Details>(raw).map_err(|e| {
                    LedgerError::Validation {
                        reason: format!("--details must be a JSON object: {}", e),
                    }
                })?;
            }
            let entry = ledger.submit(event)?;
            print_json_line(&entry)
        }

        Command::Verify {
            from,
            to,
            checkpoint,
        } => {
            let result = match checkpoint {
                Some(path) => {
                    let checkpoint: Checkpoint = read_json(path)?;
                    ledger.verify_checkpoint(&checkpoint)?
                }
                None => ledger.verify(SequenceRange {
                    start: *from,
                    end: *to,
                })?,
            };
            report(ledger, &result);
            result.into_result().map(|_| ())
        }

        Command::Checkpoint { out } => {
            let checkpoint = ledger.checkpoint()?;
            write_json(out.as_deref(), &checkpoint)
        }

        Command::Show {
            from,
            to,
            actor,
            resource,
            latest,
        } => {
            let query = ledger.query();
            let entries: Vec<LedgerEntry> = match (latest, actor, resource) {
                (Some(n), _, _) => query.latest(*n)?,
                (None, Some(actor), _) => query.by_actor(actor)?,
                (None, None, Some(resource)) => query.by_resource(resource)?,
                (None, None, None) => {
                    if ledger.is_empty()? {
                        Vec::new()
                    } else {
                        query.by_range(SequenceRange {
                            start: *from,
                            end: *to,
                        })?
                    }
                }
            };
            entries.iter().try_for_each(print_json_line)
        }

        Command::Export { out } => {
            let export = ledger.export()?;
            write_json(out.as_deref(), &export)
        }

        Command::Demo => demo::run(),
    }
}

fn report(ledger: &Ledger, result: &VerificationResult) {
    match result {
        VerificationResult::Intact {
            start,
            entries_checked,
            final_hash,
        } => {
            println!("Chain:          {}", ledger.chain_id());
            println!("Status:         INTACT");
            println!("Window start:   {}", start);
            println!("Entries:        {}", entries_checked);
            println!("Final hash:     {}", final_hash);
        }
        VerificationResult::Broken(violation) => {
            println!("Chain:          {}", ledger.chain_id());
            println!("Status:         BROKEN");
            println!("Sequence:       {}", violation.sequence);
            println!("Failure:        {}", violation.kind);
            println!("Expected:       {}", violation.expected);
            println!("Actual:         {}", violation.actual);
        }
    }
}

// ── JSON I/O ──────────────────────────────────────────────────────────────────

fn print_json_line<T: Serialize>(value: &T) -> LedgerResult<()> {
    let line = serde_json::to_string(value).map_err(|e| LedgerError::Validation {
        reason: format!("failed to encode output: {}", e),
    })?;
    println!("{}", line);
    Ok(())
}

/// Pretty-print `value` to `out`, or to stdout when no path is given.
fn write_json<T: Serialize>(out: Option<&Path>, value: &T) -> LedgerResult<()> {
    let mut json = serde_json::to_vec_pretty(value).map_err(|e| LedgerError::Validation {
        reason: format!("failed to encode output: {}", e),
    })?;
    json.push(b'\n');

    let written = match out {
        Some(path) => fs::write(path, &json),
        None => io::stdout().lock().write_all(&json),
    };
    written.map_err(|e| LedgerError::StoreUnavailable {
        reason: format!("failed to write output: {}", e),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> LedgerResult<T> {
    let contents = fs::read(path).map_err(|e| LedgerError::NotFound {
        reason: format!("cannot read '{}': {}", path.display(), e),
    })?;
    serde_json::from_slice(&contents).map_err(|e| LedgerError::Validation {
        reason: format!("'{}' is not a valid document: {}", path.display(), e),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
