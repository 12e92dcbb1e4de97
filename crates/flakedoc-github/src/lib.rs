//! GitHub Actions evidence adapters for Flakedoc.
//!
//! Implements the `flakedoc-core` provider contracts against the
//! GitHub REST API:
//! - workflow-run listing and pass/fail summarization (run metrics)
//! - per-job log scanning for failure-indicator lines (log snippets)
//!
//! Outbound calls carry a bounded timeout and no retry policy; callers
//! treat failures as missing evidence.

pub mod client;
pub mod error;
pub mod logs;
pub mod metrics;

pub use client::{ActionsClient, GithubConfig};
pub use error::GithubError;
pub use logs::JobSummary;
pub use metrics::{summarize, WorkflowRun};
