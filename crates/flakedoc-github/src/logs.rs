//! Per-job log scanning for failure-indicator lines.
//!
//! Jobs play the role of log files: the scan walks up to `max_files`
//! jobs of a run in listing order, collecting matching lines in
//! file-then-line order until `max_snippets` are found.

use crate::client::ActionsClient;
use crate::error::GithubError;
use async_trait::async_trait;
use flakedoc_core::evidence::{LogScan, LogSnippetProvider, ProviderError};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

/// GitHub caps `per_page` at 100 for the jobs listing.
const JOBS_PER_PAGE_CAP: usize = 100;

/// One job of a workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSummary {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct JobsPage {
    #[serde(default)]
    jobs: Vec<JobSummary>,
}

impl ActionsClient {
    /// List up to `limit` jobs of `run_id`.
    pub async fn list_jobs(
        &self,
        repo: &str,
        run_id: u64,
        limit: usize,
    ) -> Result<Vec<JobSummary>, GithubError> {
        let url = format!(
            "{}/repos/{}/actions/runs/{}/jobs",
            self.config.api_base, repo, run_id
        );
        let query = vec![("per_page", limit.min(JOBS_PER_PAGE_CAP).to_string())];
        let mut page: JobsPage = self.get_json(&url, &query).await?;
        page.jobs.truncate(limit);
        Ok(page.jobs)
    }

    /// Fetch the plain-text log of one job.
    pub async fn job_log(&self, repo: &str, job_id: u64) -> Result<String, GithubError> {
        let url = format!(
            "{}/repos/{}/actions/jobs/{}/logs",
            self.config.api_base, repo, job_id
        );
        self.get_text(&url).await
    }
}

/// Append lines of `text` matching `pattern` to `out`, trimmed, until
/// `max_snippets` are collected. Returns true when the cap is hit.
fn collect_failure_lines(
    pattern: &Regex,
    text: &str,
    max_snippets: usize,
    out: &mut Vec<String>,
) -> bool {
    for line in text.lines() {
        if pattern.is_match(line) {
            out.push(line.trim().to_string());
            if out.len() >= max_snippets {
                return true;
            }
        }
    }
    false
}

#[async_trait]
impl LogSnippetProvider for ActionsClient {
    async fn failure_snippets(
        &self,
        repo: &str,
        run_id: u64,
        max_files: usize,
        max_snippets: usize,
    ) -> Result<LogScan, ProviderError> {
        let jobs = self
            .list_jobs(repo, run_id, max_files)
            .await
            .map_err(ProviderError::from)?;

        let mut scan = LogScan::default();
        for job in &jobs {
            scan.files.push(job.name.clone());
            let text = match self.job_log(repo, job.id).await {
                Ok(text) => text,
                // One unreadable job log does not void the others.
                Err(err) => {
                    warn!(repo, run_id, job = %job.name, error = %err, "job log unavailable, skipping");
                    continue;
                }
            };
            if collect_failure_lines(&self.failure_pattern, &text, max_snippets, &mut scan.snippets)
            {
                break;
            }
        }

        debug!(
            repo,
            run_id,
            files = scan.files.len(),
            snippets = scan.snippets.len(),
            "scanned run logs"
        );
        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        Regex::new(r"(?i)\b(FAIL|FAILED|ERROR|Traceback|AssertionError)\b").unwrap()
    }

    #[test]
    fn collects_matching_lines_in_order() {
        let text = "ok line\nFAILED tests/test_a.py::test_x\nall good\nERROR: boom\n";
        let mut out = Vec::new();
        let capped = collect_failure_lines(&pattern(), text, 10, &mut out);
        assert!(!capped);
        assert_eq!(
            out,
            vec![
                "FAILED tests/test_a.py::test_x".to_string(),
                "ERROR: boom".to_string(),
            ]
        );
    }

    #[test]
    fn stops_at_snippet_cap() {
        let text = "FAIL one\nFAIL two\nFAIL three\n";
        let mut out = Vec::new();
        let capped = collect_failure_lines(&pattern(), text, 2, &mut out);
        assert!(capped);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn matching_is_case_insensitive_and_word_bounded() {
        let mut out = Vec::new();
        collect_failure_lines(&pattern(), "traceback (most recent call last):", 10, &mut out);
        assert_eq!(out.len(), 1);

        out.clear();
        // "unfailing" must not match the FAIL token.
        collect_failure_lines(&pattern(), "unfailing success", 10, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn lines_are_trimmed() {
        let mut out = Vec::new();
        collect_failure_lines(&pattern(), "   AssertionError: 1 != 2   \n", 10, &mut out);
        assert_eq!(out, vec!["AssertionError: 1 != 2".to_string()]);
    }
}
