//! Pass/fail history normalization and classification.
//!
//! The history classifier is a pure function from an outcome sequence
//! to a labeled report. Order is preserved through normalization even
//! though the current rules only use counts and mix.

use serde::{Deserialize, Serialize};

/// A single normalized test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    /// Parse one raw history token.
    ///
    /// Tokens are trimmed and lowercased; empty and unrecognized
    /// tokens yield `None` and are dropped before analysis.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "pass" => Some(Outcome::Pass),
            "fail" => Some(Outcome::Fail),
            _ => None,
        }
    }

    /// Wire token for this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw token sequence into outcomes, preserving order.
pub fn normalize<S: AsRef<str>>(raw: &[S]) -> Vec<Outcome> {
    raw.iter()
        .filter_map(|token| Outcome::parse(token.as_ref()))
        .collect()
}

/// Label assigned to a test's pass/fail history.
///
/// Always derived from the history, never stored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryLabel {
    Stable,
    Flaky,
    Regressing,
    Unknown,
}

impl HistoryLabel {
    /// Display name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryLabel::Stable => "Stable",
            HistoryLabel::Flaky => "Flaky",
            HistoryLabel::Regressing => "Regressing",
            HistoryLabel::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for HistoryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one test's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub label: HistoryLabel,
    pub failures: usize,
    pub runs: usize,
    pub flaky: bool,
}

/// Failure-rate band (inclusive) inside which a mixed history is flaky.
const FLAKE_RATE_MIN: f64 = 0.1;
const FLAKE_RATE_MAX: f64 = 0.9;

/// Classify a normalized history.
///
/// Rules, first match wins:
/// 1. mixed history with failure rate in `[0.1, 0.9]` -> `Flaky`
/// 2. any failures without a single pass -> `Regressing`
/// 3. otherwise -> `Stable`
///
/// Total function: any input, including the empty history, produces a
/// valid report. An empty history has a run count of 0 and is `Stable`.
pub fn classify(outcomes: &[Outcome]) -> HistoryReport {
    let runs = outcomes.len();
    let failures = outcomes.iter().filter(|o| **o == Outcome::Fail).count();
    // Only two variants exist, so "both present" is 0 < failures < runs.
    let mixed = failures > 0 && failures < runs;
    let rate = failures as f64 / runs.max(1) as f64;

    let label = if mixed && (FLAKE_RATE_MIN..=FLAKE_RATE_MAX).contains(&rate) {
        HistoryLabel::Flaky
    } else if rate > 0.0 && !mixed {
        HistoryLabel::Regressing
    } else {
        HistoryLabel::Stable
    };

    HistoryReport {
        label,
        failures,
        runs,
        flaky: label == HistoryLabel::Flaky,
    }
}

/// Normalize raw tokens and classify in one step.
pub fn classify_tokens<S: AsRef<str>>(raw: &[S]) -> HistoryReport {
    classify(&normalize(raw))
}
