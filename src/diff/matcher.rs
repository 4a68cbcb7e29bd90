// Row matching between expected and actual result sets
//
// Two strategies:
// - Positional: row i of expected against row i of actual
// - Unordered: greedy first-fit binding of each expected row to an unused
//   actual row
//
// The unordered matcher is O(n·m) and binds each expected row to the
// earliest unused equal actual row in scan order. It is not a minimum-cost
// bipartite matching; callers rely on its exact tie-breaking for
// reproducible samples.

use crate::diff::value::values_equal;
use serde_json::Value;

/// Result of a positional comparison
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InOrderComparison {
    /// True when every position holds equal rows and lengths agree
    pub all_equal: bool,

    /// Indices whose rows differ (or exist on one side only)
    pub mismatches: Vec<usize>,
}

/// Result of greedy unordered matching
///
/// `matched_expected[k]` is bound to `matched_actual[k]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnorderedMatch {
    pub matched_expected: Vec<usize>,
    pub matched_actual: Vec<usize>,
    pub unmatched_expected: Vec<usize>,
    pub unmatched_actual: Vec<usize>,
}

impl UnorderedMatch {
    /// Number of bound pairs
    pub fn matched_count(&self) -> usize {
        self.matched_expected.len()
    }

    /// True when nothing was left over on either side
    pub fn is_complete(&self) -> bool {
        self.unmatched_expected.is_empty() && self.unmatched_actual.is_empty()
    }
}

/// Check whether two rows are cell-for-cell equal
pub fn rows_equal(a: &[Value], b: &[Value], tolerance: f64) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|(x, y)| values_equal(x, y, tolerance))
}

/// Compare rows position by position
///
/// When lengths differ, every index past the shorter side is reported as a
/// mismatch and `all_equal` is false.
pub fn compare_in_order(
    expected: &[Vec<Value>],
    actual: &[Vec<Value>],
    tolerance: f64,
) -> InOrderComparison {
    let longest = expected.len().max(actual.len());
    let mut mismatches = Vec::new();

    for idx in 0..longest {
        match (expected.get(idx), actual.get(idx)) {
            (Some(e), Some(a)) if rows_equal(e, a, tolerance) => {}
            _ => mismatches.push(idx),
        }
    }

    InOrderComparison {
        all_equal: mismatches.is_empty(),
        mismatches,
    }
}

/// Match rows ignoring order
///
/// For each expected row (in order) the first unused actual row (in order)
/// that is equal gets bound to it. Actual rows never bound are unmatched.
///
/// # Example
/// ```
/// use querydrift::diff::match_unordered;
/// use serde_json::json;
///
/// let expected = vec![vec![json!(1)], vec![json!(2)]];
/// let actual = vec![vec![json!(2)], vec![json!(1)], vec![json!(3)]];
///
/// let m = match_unordered(&expected, &actual, 0.0);
/// assert_eq!(m.matched_actual, vec![1, 0]);
/// assert_eq!(m.unmatched_actual, vec![2]);
/// ```
pub fn match_unordered(
    expected: &[Vec<Value>],
    actual: &[Vec<Value>],
    tolerance: f64,
) -> UnorderedMatch {
    let mut used = vec![false; actual.len()];
    let mut result = UnorderedMatch::default();

    for (exp_idx, exp_row) in expected.iter().enumerate() {
        let candidate = actual
            .iter()
            .enumerate()
            .position(|(act_idx, act_row)| {
                !used[act_idx] && rows_equal(exp_row, act_row, tolerance)
            });

        match candidate {
            Some(act_idx) => {
                used[act_idx] = true;
                result.matched_expected.push(exp_idx);
                result.matched_actual.push(act_idx);
            }
            None => result.unmatched_expected.push(exp_idx),
        }
    }

    result.unmatched_actual = used
        .iter()
        .enumerate()
        .filter_map(|(idx, &bound)| (!bound).then_some(idx))
        .collect();

    result
}
