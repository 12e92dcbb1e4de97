//! Aggregate classification: history + CI metrics + log patterns.
//!
//! Combines the three evidence signals into a weighted score vector
//! over {flake, regression, infra} and picks the top category. Each
//! contributing signal also appends a human-readable justification so
//! the caller can see why a verdict was reached.

use crate::evidence::{
    EvidenceSnapshot, LogSnippetProvider, RunMetrics, RunMetricsProvider,
};
use crate::history::{self, HistoryLabel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Evidence weights.
const W_HISTORY_FLAKE: f64 = 0.6;
const W_HISTORY_REGRESSION: f64 = 0.5;
const W_METRICS: f64 = 0.2;
const W_INFRA_LOGS: f64 = 0.6;

/// Metrics thresholds.
const HEALTHY_PASS_RATE: f64 = 90.0;
const POOR_PASS_RATE: f64 = 50.0;
const MIN_RUNS_FOR_REGRESSION_SIGNAL: u64 = 10;

/// Bounds on the log scan.
const MAX_LOG_FILES: usize = 10;

/// Default snippet cap when the caller does not supply one.
pub const DEFAULT_MAX_SNIPPETS: usize = 20;

/// Substrings (lowercase) that mark a failure as infrastructure-related.
const INFRA_PATTERNS: [&str; 6] = [
    "connection reset",
    "timeout",
    "503",
    "network is unreachable",
    "dns",
    "rate limit",
];

/// Score categories, in tie-break priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Flake,
    Regression,
    Infra,
}

impl Category {
    /// Fixed priority order: earlier entries win score ties.
    pub const ALL: [Category; 3] = [Category::Flake, Category::Regression, Category::Infra];

    /// Display label for the final verdict. An explicit mapping, so
    /// the wire label never depends on runtime casing rules.
    pub fn label(self) -> &'static str {
        match self {
            Category::Flake => "Flaky",
            Category::Regression => "Regression",
            Category::Infra => "Infra",
        }
    }
}

/// Accumulated evidence weight per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    pub flake: f64,
    pub regression: f64,
    pub infra: f64,
}

impl ScoreVector {
    fn get(&self, category: Category) -> f64 {
        match category {
            Category::Flake => self.flake,
            Category::Regression => self.regression,
            Category::Infra => self.infra,
        }
    }

    fn add(&mut self, category: Category, weight: f64) {
        match category {
            Category::Flake => self.flake += weight,
            Category::Regression => self.regression += weight,
            Category::Infra => self.infra += weight,
        }
    }

    /// Category with the maximum score.
    ///
    /// Ties resolve to the earliest entry of [`Category::ALL`]
    /// (flake > regression > infra). This is policy, not accident:
    /// a later category must strictly beat the current leader.
    pub fn leader(&self) -> Category {
        let mut best = Category::Flake;
        for category in Category::ALL {
            if self.get(category) > self.get(best) {
                best = category;
            }
        }
        best
    }

    /// Copy with every component rounded to three decimal places.
    pub fn rounded(&self) -> ScoreVector {
        ScoreVector {
            flake: round3(self.flake),
            regression: round3(self.regression),
            infra: round3(self.infra),
        }
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Inputs for one aggregate classification call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateRequest {
    /// Test identifier.
    pub test_name: String,

    /// `owner/repo` for metrics and logs.
    #[serde(default)]
    pub repo: Option<String>,

    /// CI run id for log scanning (needs `repo` as well).
    #[serde(default)]
    pub run_id: Option<u64>,

    /// Explicit pass/fail history tokens.
    #[serde(default)]
    pub history: Option<Vec<String>>,

    /// Cap on collected log snippets.
    #[serde(default = "AggregateRequest::default_max_snippets")]
    pub max_log_snippets: usize,
}

impl AggregateRequest {
    fn default_max_snippets() -> usize {
        DEFAULT_MAX_SNIPPETS
    }

    /// Request with history only, no CI evidence.
    pub fn history_only(test_name: impl Into<String>, history: Vec<String>) -> Self {
        AggregateRequest {
            test_name: test_name.into(),
            repo: None,
            run_id: None,
            history: Some(history),
            max_log_snippets: DEFAULT_MAX_SNIPPETS,
        }
    }
}

/// Outcome of an aggregate classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Display label of the winning category.
    pub label: String,

    /// True iff the winning category is flake.
    pub flaky: bool,

    /// Rounded score vector.
    pub score: ScoreVector,

    /// Failure count from the explicit history (0 without one).
    pub failures: usize,

    /// Run count from the explicit history (0 without one).
    pub runs: usize,

    /// The evidence this verdict was based on.
    pub evidence: EvidenceSnapshot,

    /// Ordered human-readable justifications.
    pub reasons: Vec<String>,
}

/// Combines history, CI metrics, and log evidence into one verdict.
///
/// Provider failures downgrade to missing evidence: the classifier
/// always produces a best-effort report from whatever signals remain.
pub struct AggregateClassifier {
    metrics: Arc<dyn RunMetricsProvider>,
    logs: Arc<dyn LogSnippetProvider>,
}

impl AggregateClassifier {
    pub fn new(
        metrics: Arc<dyn RunMetricsProvider>,
        logs: Arc<dyn LogSnippetProvider>,
    ) -> Self {
        AggregateClassifier { metrics, logs }
    }

    /// Classify one test from all available evidence.
    ///
    /// Evidence is gathered sequentially (metrics, then logs, then
    /// local history); scoring starts only after all three are in.
    pub async fn classify(&self, req: &AggregateRequest) -> AggregateReport {
        let mut reasons: Vec<String> = Vec::new();

        // Metrics are tri-state: None means "no data", which must not
        // score under any threshold values.
        let mut metrics: Option<RunMetrics> = None;
        if let Some(repo) = req.repo.as_deref() {
            match self.metrics.run_metrics(repo, None).await {
                Ok(m) => {
                    reasons.push(format!(
                        "Actions pass_rate={}% over {} runs.",
                        m.pass_rate, m.total
                    ));
                    metrics = Some(m);
                }
                Err(err) => {
                    warn!(repo, error = %err, "run metrics unavailable, continuing without");
                }
            }
        }

        let mut log_snippets: Vec<String> = Vec::new();
        if let (Some(repo), Some(run_id)) = (req.repo.as_deref(), req.run_id) {
            match self
                .logs
                .failure_snippets(repo, run_id, MAX_LOG_FILES, req.max_log_snippets)
                .await
            {
                Ok(scan) => {
                    if !scan.snippets.is_empty() {
                        reasons.push(format!(
                            "Collected {} error lines from CI logs.",
                            scan.snippets.len()
                        ));
                    }
                    log_snippets = scan.snippets;
                }
                Err(err) => {
                    warn!(repo, run_id, error = %err, "log snippets unavailable, continuing without");
                }
            }
        }

        let base = req.history.as_deref().map(history::classify_tokens);
        let (base_label, failures, runs) = match &base {
            Some(report) => (report.label, report.failures, report.runs),
            None => (HistoryLabel::Unknown, 0, 0),
        };

        let mut score = ScoreVector::default();

        // History signal.
        match base_label {
            HistoryLabel::Flaky => {
                score.add(Category::Flake, W_HISTORY_FLAKE);
                reasons.push("Mixed pass/fail history suggests flake.".to_string());
            }
            HistoryLabel::Regressing => {
                score.add(Category::Regression, W_HISTORY_REGRESSION);
                reasons.push("Consistent failures suggest regression.".to_string());
            }
            HistoryLabel::Stable | HistoryLabel::Unknown => {}
        }

        // Metrics signal, only when metrics actually arrived.
        if let Some(m) = metrics {
            if m.pass_rate >= HEALTHY_PASS_RATE {
                score.add(Category::Flake, W_METRICS);
            } else if m.pass_rate <= POOR_PASS_RATE && m.total >= MIN_RUNS_FOR_REGRESSION_SIGNAL {
                score.add(Category::Regression, W_METRICS);
            }
        }

        // Log signal.
        if log_snippets.iter().any(|line| is_infra_line(line)) {
            score.add(Category::Infra, W_INFRA_LOGS);
            reasons.push("CI logs match infra-like patterns (timeouts/network).".to_string());
        }

        let winner = score.leader();
        debug!(
            test = %req.test_name,
            label = winner.label(),
            flake = score.flake,
            regression = score.regression,
            infra = score.infra,
            "aggregate classification complete"
        );

        AggregateReport {
            label: winner.label().to_string(),
            flaky: winner == Category::Flake,
            score: score.rounded(),
            failures,
            runs,
            evidence: EvidenceSnapshot {
                pass_rate: metrics.map_or(0.0, |m| m.pass_rate),
                runs_total: metrics.map_or(0, |m| m.total),
                log_snippets,
            },
            reasons,
        }
    }
}

/// Whether a log line matches one of the infra-indicator substrings.
fn is_infra_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    INFRA_PATTERNS.iter().any(|pat| lower.contains(pat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FailingLogs, FailingMetrics, StaticLogs, StaticMetrics};

    fn history(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn classifier_with(
        metrics: Arc<dyn RunMetricsProvider>,
        logs: Arc<dyn LogSnippetProvider>,
    ) -> AggregateClassifier {
        AggregateClassifier::new(metrics, logs)
    }

    #[tokio::test]
    async fn history_only_mixed_is_flaky() {
        let classifier = classifier_with(
            Arc::new(FailingMetrics),
            Arc::new(FailingLogs),
        );
        let req = AggregateRequest::history_only(
            "test_login",
            history(&["pass", "fail", "pass", "fail"]),
        );
        let report = classifier.classify(&req).await;

        assert_eq!(report.label, "Flaky");
        assert!(report.flaky);
        assert!((report.score.flake - 0.6).abs() < 1e-9);
        assert_eq!(report.evidence.pass_rate, 0.0);
        assert_eq!(report.evidence.runs_total, 0);
        assert_eq!(report.failures, 2);
        assert_eq!(report.runs, 4);
    }

    #[tokio::test]
    async fn infra_snippets_flip_the_label() {
        let logs = StaticLogs::with_snippets(vec![
            "ERROR: Connection reset by peer".to_string(),
        ]);
        let classifier = classifier_with(
            Arc::new(StaticMetrics::new(RunMetrics::from_counts(5, 3, 2))),
            Arc::new(logs),
        );
        let req = AggregateRequest {
            test_name: "test_api".to_string(),
            repo: Some("acme/widgets".to_string()),
            run_id: Some(42),
            history: None,
            max_log_snippets: DEFAULT_MAX_SNIPPETS,
        };
        let report = classifier.classify(&req).await;

        assert_eq!(report.label, "Infra");
        assert!(!report.flaky);
        assert!((report.score.infra - 0.6).abs() < 1e-9);
        assert!(report
            .reasons
            .iter()
            .any(|r| r.contains("infra-like patterns")));
    }

    #[tokio::test]
    async fn healthy_pass_rate_adds_flake_weight() {
        let classifier = classifier_with(
            Arc::new(StaticMetrics::new(RunMetrics::from_counts(30, 29, 1))),
            Arc::new(FailingLogs),
        );
        let req = AggregateRequest {
            test_name: "test_ui".to_string(),
            repo: Some("acme/widgets".to_string()),
            run_id: None,
            history: Some(history(&["pass", "fail", "pass", "fail"])),
            max_log_snippets: DEFAULT_MAX_SNIPPETS,
        };
        let report = classifier.classify(&req).await;

        // 0.6 history + 0.2 metrics.
        assert!((report.score.flake - 0.8).abs() < 1e-9);
        assert_eq!(report.label, "Flaky");
        assert_eq!(report.evidence.runs_total, 30);
    }

    #[tokio::test]
    async fn poor_pass_rate_with_enough_runs_adds_regression_weight() {
        let classifier = classifier_with(
            Arc::new(StaticMetrics::new(RunMetrics::from_counts(12, 4, 8))),
            Arc::new(FailingLogs),
        );
        let req = AggregateRequest {
            test_name: "test_db".to_string(),
            repo: Some("acme/widgets".to_string()),
            run_id: None,
            history: Some(history(&["fail", "fail", "fail"])),
            max_log_snippets: DEFAULT_MAX_SNIPPETS,
        };
        let report = classifier.classify(&req).await;

        // 0.5 history + 0.2 metrics.
        assert!((report.score.regression - 0.7).abs() < 1e-9);
        assert_eq!(report.label, "Regression");
    }

    #[tokio::test]
    async fn small_window_never_scores_regression_from_metrics() {
        let classifier = classifier_with(
            Arc::new(StaticMetrics::new(RunMetrics::from_counts(4, 1, 3))),
            Arc::new(FailingLogs),
        );
        let req = AggregateRequest {
            test_name: "test_sparse".to_string(),
            repo: Some("acme/widgets".to_string()),
            run_id: None,
            history: None,
            max_log_snippets: DEFAULT_MAX_SNIPPETS,
        };
        let report = classifier.classify(&req).await;

        assert_eq!(report.score.regression, 0.0);
        // No signal at all: tie resolves to flake.
        assert_eq!(report.label, "Flaky");
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_missing_evidence() {
        let classifier = classifier_with(
            Arc::new(FailingMetrics),
            Arc::new(FailingLogs),
        );
        let req = AggregateRequest {
            test_name: "test_offline".to_string(),
            repo: Some("acme/widgets".to_string()),
            run_id: Some(7),
            history: Some(history(&["fail", "fail"])),
            max_log_snippets: DEFAULT_MAX_SNIPPETS,
        };
        let report = classifier.classify(&req).await;

        assert_eq!(report.label, "Regression");
        assert_eq!(report.evidence.pass_rate, 0.0);
        assert_eq!(report.evidence.runs_total, 0);
        assert!(report.evidence.log_snippets.is_empty());
    }

    #[test]
    fn tie_break_prefers_flake_then_regression() {
        let even = ScoreVector::default();
        assert_eq!(even.leader(), Category::Flake);

        let mut tied = ScoreVector::default();
        tied.add(Category::Regression, 0.4);
        tied.add(Category::Infra, 0.4);
        assert_eq!(tied.leader(), Category::Regression);
    }

    #[test]
    fn scores_round_to_three_decimals() {
        let mut score = ScoreVector::default();
        score.add(Category::Flake, 0.1 + 0.2 + 0.3); // accumulates fp noise
        let rounded = score.rounded();
        assert_eq!(rounded.flake, 0.6);
    }
}
