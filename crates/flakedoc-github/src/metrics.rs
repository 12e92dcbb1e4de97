//! Workflow-run listing and pass/fail summarization.

use crate::client::ActionsClient;
use crate::error::GithubError;
use async_trait::async_trait;
use flakedoc_core::evidence::{ProviderError, RunMetrics, RunMetricsProvider};
use serde::Deserialize;
use tracing::debug;

/// Runs fetched per page.
const PER_PAGE: usize = 30;

/// Pages walked per listing; bounds the metrics window.
const MAX_PAGES: usize = 3;

/// One workflow run, reduced to the fields the summary needs.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default, rename = "head_branch")]
    pub branch: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
struct RunsPage {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

impl ActionsClient {
    /// List the most recent workflow runs of `repo`, newest first,
    /// optionally filtered to `branch`. Bounded to `MAX_PAGES` pages of
    /// `PER_PAGE` runs; stops early on a short page.
    pub async fn list_runs(
        &self,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<Vec<WorkflowRun>, GithubError> {
        let url = format!("{}/repos/{}/actions/runs", self.config.api_base, repo);
        let mut runs: Vec<WorkflowRun> = Vec::new();

        for page in 1..=MAX_PAGES {
            let mut query = vec![
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            if let Some(branch) = branch {
                query.push(("branch", branch.to_string()));
            }

            let fetched: RunsPage = self.get_json(&url, &query).await?;
            let count = fetched.workflow_runs.len();
            runs.extend(fetched.workflow_runs);
            if count < PER_PAGE {
                break;
            }
        }

        debug!(repo, runs = runs.len(), "listed workflow runs");
        Ok(runs)
    }
}

/// Summarize run conclusions into pass/fail metrics.
///
/// `success` counts as passed; `failure`, `cancelled`, and `timed_out`
/// count as failed. Anything else (still running, skipped) is counted
/// only in the total.
pub fn summarize(runs: &[WorkflowRun]) -> RunMetrics {
    let total = runs.len() as u64;
    let mut passed = 0u64;
    let mut failed = 0u64;
    for run in runs {
        match run
            .conclusion
            .as_deref()
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "success" => passed += 1,
            "failure" | "cancelled" | "timed_out" => failed += 1,
            _ => {}
        }
    }
    RunMetrics::from_counts(total, passed, failed)
}

#[async_trait]
impl RunMetricsProvider for ActionsClient {
    async fn run_metrics(
        &self,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<RunMetrics, ProviderError> {
        let runs = self.list_runs(repo, branch).await.map_err(ProviderError::from)?;
        Ok(summarize(&runs))
    }
}
