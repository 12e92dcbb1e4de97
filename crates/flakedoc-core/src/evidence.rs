//! Evidence provider contracts and snapshot types.
//!
//! Providers are the seam between the classification core and the
//! outside world (CI APIs, log stores). The aggregate classifier only
//! depends on the traits here; production adapters live in
//! `flakedoc-github` and in-memory fakes in [`crate::fakes`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregate pass/fail metrics over a window of recent CI runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    /// Percentage in `[0, 100]`, rounded to two decimal places.
    pub pass_rate: f64,
}

impl RunMetrics {
    /// Build metrics from counts.
    ///
    /// `pass_rate` is `100 * passed / total` rounded to two decimals,
    /// or `0.0` for an empty window.
    pub fn from_counts(total: u64, passed: u64, failed: u64) -> Self {
        let pass_rate = if total == 0 {
            0.0
        } else {
            (100.0 * passed as f64 / total as f64 * 100.0).round() / 100.0
        };
        RunMetrics {
            total,
            passed,
            failed,
            pass_rate,
        }
    }
}

/// Failure-indicating lines scanned out of one run's logs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogScan {
    /// Names of the log files visible to the scan, in scan order.
    pub files: Vec<String>,
    /// Matching lines in file-then-line order, capped by the caller.
    /// Not deduplicated.
    pub snippets: Vec<String>,
}

/// Evidence gathered for a single classification call.
///
/// Ephemeral: fetched fresh per call, never cached or persisted.
/// `pass_rate`/`runs_total` default to zero when no metrics evidence
/// was available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    pub pass_rate: f64,
    pub runs_total: u64,
    pub log_snippets: Vec<String>,
}

/// Errors surfaced by evidence providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or auth failure reaching the provider. The aggregate
    /// classifier treats this as missing evidence, never as fatal.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with something the adapter could not decode.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Source of aggregate run metrics for a repository/branch window.
#[async_trait]
pub trait RunMetricsProvider: Send + Sync {
    /// Summarize the most recent runs of `repo` (optionally filtered
    /// to `branch`). The window is bounded and paginated by the
    /// implementation.
    async fn run_metrics(
        &self,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<RunMetrics, ProviderError>;
}

/// Source of failure-indicating log lines for a specific run.
#[async_trait]
pub trait LogSnippetProvider: Send + Sync {
    /// Scan up to `max_files` log files of `run_id` for lines matching
    /// a failure-indicator pattern, stopping once `max_snippets` lines
    /// are collected or files are exhausted.
    async fn failure_snippets(
        &self,
        repo: &str,
        run_id: u64,
        max_files: usize,
        max_snippets: usize,
    ) -> Result<LogScan, ProviderError>;
}
