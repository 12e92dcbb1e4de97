//! Flakedoc Core - Flaky Test Doctor domain model
//!
//! The classification core combines three independent evidence signals:
//! - raw pass/fail history for one test identity
//! - aggregate CI pass-rate over a window of recent runs
//! - failure-indicator lines scanned out of CI logs
//!
//! into a single label with a confidence-like score vector. Every
//! decision is recorded in an append-only, hash-chained audit log that
//! is independently verifiable for tamper evidence.
//!
//! Evidence is fetched through the provider traits in [`evidence`];
//! production adapters live in `flakedoc-github`, and in-memory fakes
//! for testing live in [`fakes`].

pub mod aggregate;
pub mod audit;
pub mod evidence;
pub mod fakes;
pub mod history;
pub mod suggest;

pub use aggregate::{AggregateClassifier, AggregateReport, AggregateRequest, Category, ScoreVector};
pub use audit::{
    verify_chain, AuditError, AuditLog, AuditRecord, AuditStore, FileAuditStore, MemoryAuditStore,
    GENESIS_HASH,
};
pub use evidence::{
    EvidenceSnapshot, LogScan, LogSnippetProvider, ProviderError, RunMetrics, RunMetricsProvider,
};
pub use history::{classify, classify_tokens, normalize, HistoryLabel, HistoryReport, Outcome};
pub use suggest::suggest_fixes;

/// Flakedoc core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
