//! Tamper-evident audit log: an append-only NDJSON hash chain.
//!
//! Every tool invocation (success or error) becomes one [`AuditRecord`]
//! whose `hash` covers the canonical serialization of the record and
//! whose `prev` links it to its predecessor. A verifier can detect
//! truncation, reordering, or modification by recomputing the chain.
//!
//! Storage is an injected seam ([`AuditStore`]): production binds a
//! file-backed store, tests an in-memory one. The read-last/append
//! sequence runs under one mutex so two concurrent `record` calls can
//! never claim the same `prev`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Sentinel `prev` anchoring the chain: 64 zero characters.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// One immutable entry in the audit chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the call was recorded.
    pub ts: DateTime<Utc>,
    /// Event name (tool method, or "exception" for the error path).
    pub event: String,
    /// Whether the call succeeded.
    pub ok: bool,
    /// Call duration in milliseconds, rounded to three decimals.
    pub t_ms: f64,
    /// Request payload as received (post-validation).
    pub payload: Value,
    /// Result payload (trimmed for bulky tools).
    pub result: Value,
    /// Hash of the previous entry, or [`GENESIS_HASH`].
    pub prev: String,
    /// SHA-256 over the canonical serialization of this entry
    /// excluding this field.
    pub hash: String,
}

/// Errors from audit log operations.
///
/// Write failures are never swallowed: audit durability is a delivered
/// guarantee, so they propagate to the caller.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit entry is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audit chain broken at entry {index}: {reason}")]
    ChainBroken { index: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, AuditError>;

/// Storage backend seam for the audit log.
pub trait AuditStore: Send + Sync {
    /// Append one serialized record as a line.
    fn append_line(&self, line: &str) -> Result<()>;

    /// Last non-empty line, if any.
    fn last_line(&self) -> Result<Option<String>>;

    /// All non-empty lines in append order. Used for verification,
    /// not by the normal record path.
    fn read_all(&self) -> Result<Vec<String>>;
}

/// File-backed store: newline-delimited JSON, UTF-8, append-only.
/// The file is created lazily on first append.
pub struct FileAuditStore {
    path: PathBuf,
}

impl FileAuditStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileAuditStore { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl AuditStore for FileAuditStore {
    fn append_line(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    fn last_line(&self) -> Result<Option<String>> {
        Ok(self.read_all()?.pop())
    }

    fn read_all(&self) -> Result<Vec<String>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryAuditStore {
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for MemoryAuditStore {
    fn append_line(&self, line: &str) -> Result<()> {
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn last_line(&self) -> Result<Option<String>> {
        Ok(self.lines.lock().unwrap().last().cloned())
    }

    fn read_all(&self) -> Result<Vec<String>> {
        Ok(self.lines.lock().unwrap().clone())
    }
}

/// Hash-chained audit log over an injected store.
pub struct AuditLog {
    store: Box<dyn AuditStore>,
    // Serializes the read-last/append sequence (single-writer
    // discipline); without it, concurrent records could share a prev.
    writer: Mutex<()>,
}

impl AuditLog {
    pub fn new(store: Box<dyn AuditStore>) -> Self {
        AuditLog {
            store,
            writer: Mutex::new(()),
        }
    }

    /// File-backed log at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(FileAuditStore::new(path)))
    }

    /// In-memory log for tests.
    pub fn memory() -> Self {
        Self::new(Box::new(MemoryAuditStore::new()))
    }

    /// Record one tool invocation and return the completed entry.
    ///
    /// Invoked for successes and errors alike; the error path passes
    /// the error message as `result` with `ok = false`.
    pub fn record(
        &self,
        event: &str,
        payload: Value,
        result: Value,
        ok: bool,
        t_ms: f64,
    ) -> Result<AuditRecord> {
        let _guard = self.writer.lock().unwrap();

        let prev = match self.store.last_line()? {
            Some(line) => serde_json::from_str::<AuditRecord>(&line)?.hash,
            None => GENESIS_HASH.to_string(),
        };

        let mut record = AuditRecord {
            ts: Utc::now(),
            event: event.to_string(),
            ok,
            t_ms: (t_ms * 1000.0).round() / 1000.0,
            payload,
            result,
            prev,
            hash: String::new(),
        };
        record.hash = chain_hash(&record)?;

        self.store.append_line(&serde_json::to_string(&record)?)?;
        debug!(event, ok, "audit entry appended");
        Ok(record)
    }

    /// Most recent entry, if any.
    pub fn last(&self) -> Result<Option<AuditRecord>> {
        match self.store.last_line()? {
            Some(line) => Ok(Some(serde_json::from_str(&line)?)),
            None => Ok(None),
        }
    }

    /// Re-read the store and verify the whole chain.
    ///
    /// Returns the number of verified entries.
    pub fn verify(&self) -> Result<usize> {
        let mut records = Vec::new();
        for line in self.store.read_all()? {
            records.push(serde_json::from_str(&line)?);
        }
        verify_chain(&records)?;
        Ok(records.len())
    }
}

/// SHA-256 over the canonical serialization of `record` without its
/// `hash` field.
///
/// Canonical means stable key order: converting to a `serde_json::Value`
/// first puts every object behind a sorted map, so the byte stream is
/// independent of struct field order.
fn chain_hash(record: &AuditRecord) -> Result<String> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value {
        map.remove("hash");
    }
    let canonical = serde_json::to_string(&value)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

/// Verify hash linkage and per-entry digests for a full chain.
///
/// Checks, in order: the first entry's `prev` is the zero sentinel,
/// each later `prev` equals the predecessor's `hash`, and every stored
/// `hash` matches the recomputed digest.
pub fn verify_chain(records: &[AuditRecord]) -> Result<()> {
    let mut expected_prev = GENESIS_HASH.to_string();
    for (index, record) in records.iter().enumerate() {
        if record.prev != expected_prev {
            return Err(AuditError::ChainBroken {
                index,
                reason: format!(
                    "prev '{}' does not link to '{}'",
                    record.prev, expected_prev
                ),
            });
        }
        let recomputed = chain_hash(record)?;
        if recomputed != record.hash {
            return Err(AuditError::ChainBroken {
                index,
                reason: "stored hash does not match recomputed digest".to_string(),
            });
        }
        expected_prev = record.hash.clone();
    }
    Ok(())
}
