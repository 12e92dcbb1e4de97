//! Deterministic-fix heuristics for unstable tests.
//!
//! A static rule table, not a learned model: the same history always
//! produces the same hints, sorted and deduplicated.

use crate::history::Outcome;
use std::collections::BTreeSet;

/// Hints that apply to every test under investigation.
const BASELINE_HINTS: [&str; 2] = [
    "Mock external deps (network/files/db) to remove nondeterminism.",
    "Ensure test order independence; isolate global state and I/O.",
];

/// Extra hints when the history shows both passes and failures.
const MIXED_HINTS: [&str; 2] = [
    "Seed RNG; replace sleeps with condition-based waits.",
    "Freeze or fake the clock to eliminate time drift.",
];

/// Suggest deterministic fixes for a test with the given history.
///
/// Always contains the baseline hints; a mixed pass/fail history adds
/// the nondeterminism hints. The result is lexicographically sorted
/// with no duplicates.
pub fn suggest_fixes(outcomes: &[Outcome]) -> Vec<String> {
    let mut hints: BTreeSet<&'static str> = BTreeSet::new();
    hints.extend(BASELINE_HINTS);

    let mixed =
        outcomes.contains(&Outcome::Pass) && outcomes.contains(&Outcome::Fail);
    if mixed {
        hints.extend(MIXED_HINTS);
    }

    hints.into_iter().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::normalize;

    #[test]
    fn uniform_history_gets_baseline_hints_only() {
        let outcomes = normalize(&["pass", "pass", "pass"]);
        let hints = suggest_fixes(&outcomes);
        assert_eq!(hints.len(), 2);
    }

    #[test]
    fn mixed_history_gets_strictly_more_hints() {
        let uniform = suggest_fixes(&normalize(&["fail", "fail"]));
        let mixed = suggest_fixes(&normalize(&["pass", "fail"]));
        assert!(mixed.len() > uniform.len());
        assert_eq!(mixed.len(), 4);
    }

    #[test]
    fn hints_are_sorted_and_deduplicated() {
        let hints = suggest_fixes(&normalize(&["pass", "fail", "pass"]));
        let mut sorted = hints.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(hints, sorted);
    }

    #[test]
    fn empty_history_still_gets_baseline_hints() {
        let hints = suggest_fixes(&[]);
        assert_eq!(hints.len(), 2);
    }
}
