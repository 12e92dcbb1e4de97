//! In-memory fakes for the evidence provider traits (testing only)
//!
//! Provides `StaticMetrics`, `StaticLogs`, and their always-failing
//! counterparts so classifier and dispatch tests run without any
//! external dependencies.

use async_trait::async_trait;

use crate::evidence::{
    LogScan, LogSnippetProvider, ProviderError, RunMetrics, RunMetricsProvider,
};

/// Returns the same metrics for every repository.
#[derive(Debug, Clone)]
pub struct StaticMetrics {
    metrics: RunMetrics,
}

impl StaticMetrics {
    pub fn new(metrics: RunMetrics) -> Self {
        StaticMetrics { metrics }
    }
}

#[async_trait]
impl RunMetricsProvider for StaticMetrics {
    async fn run_metrics(
        &self,
        _repo: &str,
        _branch: Option<&str>,
    ) -> Result<RunMetrics, ProviderError> {
        Ok(self.metrics)
    }
}

/// Returns a fixed log scan for every run, honoring the snippet cap.
#[derive(Debug, Clone, Default)]
pub struct StaticLogs {
    files: Vec<String>,
    snippets: Vec<String>,
}

impl StaticLogs {
    pub fn new(files: Vec<String>, snippets: Vec<String>) -> Self {
        StaticLogs { files, snippets }
    }

    pub fn with_snippets(snippets: Vec<String>) -> Self {
        StaticLogs {
            files: vec!["job.txt".to_string()],
            snippets,
        }
    }
}

#[async_trait]
impl LogSnippetProvider for StaticLogs {
    async fn failure_snippets(
        &self,
        _repo: &str,
        _run_id: u64,
        _max_files: usize,
        max_snippets: usize,
    ) -> Result<LogScan, ProviderError> {
        Ok(LogScan {
            files: self.files.clone(),
            snippets: self
                .snippets
                .iter()
                .take(max_snippets)
                .cloned()
                .collect(),
        })
    }
}

/// Always unavailable, as if the network were down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingMetrics;

#[async_trait]
impl RunMetricsProvider for FailingMetrics {
    async fn run_metrics(
        &self,
        _repo: &str,
        _branch: Option<&str>,
    ) -> Result<RunMetrics, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }
}

/// Always unavailable, as if the network were down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingLogs;

#[async_trait]
impl LogSnippetProvider for FailingLogs {
    async fn failure_snippets(
        &self,
        _repo: &str,
        _run_id: u64,
        _max_files: usize,
        _max_snippets: usize,
    ) -> Result<LogScan, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }
}
