//! Convert pytest terminal output into pass/fail history tokens.
//!
//! Three sources, tried in order per line: per-test status lines
//! (`tests/test_x.py::test_y PASSED`), bare status lines with no node
//! id (aggregated under the suite pseudo-node), and finally the
//! summary line (`3 passed, 2 failed`) when nothing else matched.

use regex::Regex;
use std::collections::BTreeMap;

/// Pseudo node id for suite-level aggregation.
pub const SUITE_KEY: &str = "__suite__";

/// Per-test histories: node id -> ["pass"/"fail", ...].
pub type Histories = BTreeMap<String, Vec<String>>;

/// Map one pytest status word to a history token.
///
/// Skipped outcomes are ignored unless `include_skipped`, in which
/// case they count as passes.
fn status_token(status: &str, include_skipped: bool) -> Option<&'static str> {
    match status.to_ascii_lowercase().as_str() {
        "passed" | "xpassed" => Some("pass"),
        "failed" | "error" | "xfailed" => Some("fail"),
        "skipped" if include_skipped => Some("pass"),
        _ => None,
    }
}

/// Parse plaintext pytest output into per-test histories.
///
/// A per-test line must carry a `::`-style node id; that keeps summary
/// lines like `3 passed, 2 failed` from registering as tests.
pub fn parse_plaintext(text: &str, include_skipped: bool) -> Histories {
    let nodeid_line = Regex::new(
        r"(?i)(?P<nodeid>\S+::\S+)\s+(?P<status>PASSED|FAILED|ERROR|XPASSED|XFAILED|SKIPPED)\b",
    )
    .expect("nodeid pattern");
    let bare_status =
        Regex::new(r"(?i)^(PASSED|FAILED|ERROR|XPASSED|XFAILED|SKIPPED)$").expect("bare pattern");

    let mut per_test: Histories = BTreeMap::new();

    for line in text.lines() {
        if let Some(caps) = nodeid_line.captures(line) {
            let nodeid = caps["nodeid"].to_string();
            if let Some(token) = status_token(&caps["status"], include_skipped) {
                per_test.entry(nodeid).or_default().push(token.to_string());
            }
            continue;
        }

        // Bare status line: count it against the suite.
        if let Some(caps) = bare_status.captures(line.trim()) {
            if let Some(token) = status_token(&caps[1], include_skipped) {
                per_test
                    .entry(SUITE_KEY.to_string())
                    .or_default()
                    .push(token.to_string());
            }
        }
    }

    // Nothing matched line by line: fall back to the summary counts.
    if per_test.is_empty() {
        let passed = extract_count(text, r"(?i)(\d+)\s+passed");
        let failed = extract_count(text, r"(?i)(\d+)\s+failed");
        let errored = extract_count(text, r"(?i)(\d+)\s+error");
        let xpassed = extract_count(text, r"(?i)(\d+)\s+xpassed");
        let xfailed = extract_count(text, r"(?i)(\d+)\s+xfailed");
        let skipped = extract_count(text, r"(?i)(\d+)\s+skipped");

        let mut suite: Vec<String> = Vec::new();
        let passes = passed + xpassed + if include_skipped { skipped } else { 0 };
        suite.extend(std::iter::repeat("pass".to_string()).take(passes));
        suite.extend(std::iter::repeat("fail".to_string()).take(failed + errored + xfailed));
        if !suite.is_empty() {
            per_test.insert(SUITE_KEY.to_string(), suite);
        }
    }

    per_test
}

fn extract_count(text: &str, pattern: &str) -> usize {
    Regex::new(pattern)
        .expect("count pattern")
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Find the history best matching `query`: exact node id first, then
/// substring matches, preferring the longest history (most signal).
pub fn best_match<'a>(per_test: &'a Histories, query: &str) -> Option<(&'a str, &'a Vec<String>)> {
    let query_low = query.to_lowercase();

    for (nodeid, history) in per_test {
        if nodeid.to_lowercase() == query_low {
            return Some((nodeid, history));
        }
    }

    per_test
        .iter()
        .filter(|(nodeid, _)| nodeid.to_lowercase().contains(&query_low))
        .max_by_key(|(_, history)| history.len())
        .map(|(nodeid, history)| (nodeid.as_str(), history))
}
