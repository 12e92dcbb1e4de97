//! Typed request/response contracts for each exposed tool.
//!
//! Every tool's input and output is an explicit record validated at
//! the boundary (`serde_json::from_value`), not ad hoc map access.
//! `classify_aggregate` reuses the core's own request/report types.

use flakedoc_core::history::HistoryLabel;
use serde::{Deserialize, Serialize};

pub use flakedoc_core::aggregate::{AggregateReport, AggregateRequest};
pub use flakedoc_core::evidence::RunMetrics;

/// Input of `is_flaky`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlakyRequest {
    /// Test identifier.
    pub test_name: String,
    /// Sequence of "pass"/"fail" outcomes.
    pub history: Vec<String>,
}

/// Output of `is_flaky`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlakyResponse {
    pub flaky: bool,
    pub failures: usize,
    pub runs: usize,
    pub label: HistoryLabel,
}

/// Input of `suggest_fix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestFixRequest {
    pub test_name: String,
    pub history: Vec<String>,
}

/// Output of `suggest_fix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestFixResponse {
    pub suggestions: Vec<String>,
}

/// Input of `get_actions_metrics`. Output is [`RunMetrics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsMetricsRequest {
    /// owner/repo
    pub repo: String,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Input of `get_ci_log_snippets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSnippetsRequest {
    pub repo: String,
    pub run_id: u64,
    #[serde(default = "LogSnippetsRequest::default_max_files")]
    pub max_files: usize,
    #[serde(default = "LogSnippetsRequest::default_max_snippets")]
    pub max_snippets: usize,
}

impl LogSnippetsRequest {
    fn default_max_files() -> usize {
        10
    }

    fn default_max_snippets() -> usize {
        20
    }
}

/// Output of `get_ci_log_snippets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSnippetsResponse {
    pub files_preview: Vec<String>,
    pub snippets: Vec<String>,
}

/// Entry of the `list_tools` catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// The exposed tool catalog.
pub fn tool_catalog() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            name: "is_flaky",
            description: "Classify a test's flakiness from pass/fail history.",
        },
        ToolInfo {
            name: "suggest_fix",
            description: "Suggest deterministic fixes for a flaky test.",
        },
        ToolInfo {
            name: "get_actions_metrics",
            description: "Summarize CI pass/fail metrics for a repo/branch.",
        },
        ToolInfo {
            name: "get_ci_log_snippets",
            description: "Fetch failure snippets from a CI run's logs.",
        },
        ToolInfo {
            name: "classify_aggregate",
            description: "Aggregate history + CI metrics + logs to reduce false alarms.",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_snippets_request_fills_defaults() {
        let req: LogSnippetsRequest =
            serde_json::from_value(json!({"repo": "acme/widgets", "run_id": 7})).unwrap();
        assert_eq!(req.max_files, 10);
        assert_eq!(req.max_snippets, 20);
    }

    #[test]
    fn aggregate_request_defaults_snippet_cap() {
        let req: AggregateRequest =
            serde_json::from_value(json!({"test_name": "test_x"})).unwrap();
        assert_eq!(req.max_log_snippets, 20);
        assert!(req.repo.is_none());
        assert!(req.history.is_none());
    }

    #[test]
    fn flaky_request_rejects_missing_history() {
        let parsed: Result<FlakyRequest, _> =
            serde_json::from_value(json!({"test_name": "test_x"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn history_label_serializes_title_case() {
        let resp = FlakyResponse {
            flaky: false,
            failures: 0,
            runs: 2,
            label: HistoryLabel::Stable,
        };
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(wire["label"], "Stable");
    }
}
