//! Result set comparison
//!
//! Classifies a pair of result sets (expected from the baseline run, actual
//! from the re-run) into exactly one [`DiffCategory`]:
//!
//! - **identical**: same columns, same rows, same order
//! - **ordering**: same rows, different order
//! - **values**: same row count but some rows changed, or the column lists
//!   differ (schema mismatch)
//! - **row_count**: rows only added or only removed
//! - **multiple**: rows both added and removed
//!
//! Numeric cells compare with an optional tolerance and timestamps compare
//! as instants (see [`values_equal`]).
//!
//! # Example
//!
//! ```
//! use querydrift::diff::{compare, DiffCategory, DiffConfig, ResultSet};
//! use serde_json::json;
//!
//! let expected = ResultSet::new(
//!     vec!["id".into(), "val".into()],
//!     vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
//! );
//! let actual = ResultSet::new(
//!     vec!["id".into(), "val".into()],
//!     vec![vec![json!(2), json!("b")], vec![json!(1), json!("a")]],
//! );
//!
//! let diff = compare(&expected, &actual, &DiffConfig::default());
//! assert_eq!(diff.category, DiffCategory::Ordering);
//! assert!(!diff.identical);
//! ```

mod config;
mod matcher;
mod value;

pub use config::DiffConfig;
pub use matcher::{compare_in_order, match_unordered, rows_equal, InOrderComparison, UnorderedMatch};
pub use value::values_equal;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row: ordered, nullable cells
pub type Row = Vec<Value>;

/// Rows returned by one query execution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Category of difference between two result sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffCategory {
    Identical,
    Ordering,
    Values,
    RowCount,
    Multiple,
}

impl DiffCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffCategory::Identical => "identical",
            DiffCategory::Ordering => "ordering",
            DiffCategory::Values => "values",
            DiffCategory::RowCount => "row_count",
            DiffCategory::Multiple => "multiple",
        }
    }
}

impl std::fmt::Display for DiffCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expected row paired with the actual row that replaced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedRow {
    pub expected: Row,
    pub actual: Row,
}

/// Outcome of comparing two result sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDiff {
    pub category: DiffCategory,

    /// True iff `category` is [`DiffCategory::Identical`]
    pub identical: bool,

    pub expected_rows: usize,
    pub actual_rows: usize,
    pub matching_rows: usize,
    pub added_rows: usize,
    pub removed_rows: usize,
    pub modified_rows: usize,

    /// Rows only present in actual (at most `max_samples`)
    pub sample_added: Vec<Row>,

    /// Rows only present in expected (at most `max_samples`)
    pub sample_removed: Vec<Row>,

    /// Expected/actual pairs that differ (at most `max_samples`)
    pub sample_modified: Vec<ModifiedRow>,

    /// Column names of the expected result set
    pub columns: Vec<String>,
}

impl StructuredDiff {
    fn empty(category: DiffCategory, expected: &ResultSet, actual: &ResultSet) -> Self {
        Self {
            category,
            identical: category == DiffCategory::Identical,
            expected_rows: expected.row_count(),
            actual_rows: actual.row_count(),
            matching_rows: 0,
            added_rows: 0,
            removed_rows: 0,
            modified_rows: 0,
            sample_added: Vec::new(),
            sample_removed: Vec::new(),
            sample_modified: Vec::new(),
            columns: expected.columns.clone(),
        }
    }

    /// One-line description of the difference
    pub fn summary(&self) -> String {
        match self.category {
            DiffCategory::Identical => format!("{} rows identical", self.expected_rows),
            DiffCategory::Ordering => format!(
                "{} rows match but are returned in a different order",
                self.matching_rows
            ),
            DiffCategory::Values if self.matching_rows == 0 && self.modified_rows == 0 => {
                "column lists differ".to_string()
            }
            DiffCategory::Values => format!(
                "{} of {} rows modified",
                self.modified_rows, self.expected_rows
            ),
            DiffCategory::RowCount | DiffCategory::Multiple => format!(
                "expected {} rows, got {} (+{} added, -{} removed)",
                self.expected_rows, self.actual_rows, self.added_rows, self.removed_rows
            ),
        }
    }
}

/// Compare two result sets
///
/// The first applicable rule decides the category:
/// 1. Column lists differ → `values` with no row tallies
/// 2. Same row count, positionally equal → `identical`
/// 3. Same row count, equal as a multiset → `ordering`, else `values`
/// 4. Different row count → `row_count` or `multiple`
pub fn compare(expected: &ResultSet, actual: &ResultSet, config: &DiffConfig) -> StructuredDiff {
    let tolerance = config.float_tolerance;

    if expected.columns != actual.columns {
        tracing::debug!(
            expected = ?expected.columns,
            actual = ?actual.columns,
            "column lists differ"
        );
        return StructuredDiff::empty(DiffCategory::Values, expected, actual);
    }

    let diff = if expected.row_count() == actual.row_count() {
        compare_same_length(expected, actual, config)
    } else {
        compare_different_length(expected, actual, config)
    };

    tracing::debug!(
        category = %diff.category,
        expected_rows = diff.expected_rows,
        actual_rows = diff.actual_rows,
        tolerance,
        "result sets compared"
    );

    diff
}

fn compare_same_length(expected: &ResultSet, actual: &ResultSet, config: &DiffConfig) -> StructuredDiff {
    let tolerance = config.float_tolerance;

    let in_order = compare_in_order(&expected.rows, &actual.rows, tolerance);
    if in_order.all_equal {
        let mut diff = StructuredDiff::empty(DiffCategory::Identical, expected, actual);
        diff.matching_rows = expected.row_count();
        return diff;
    }

    tracing::trace!(
        mismatches = in_order.mismatches.len(),
        "positional mismatches, trying unordered match"
    );

    let matched = match_unordered(&expected.rows, &actual.rows, tolerance);
    if matched.is_complete() {
        let mut diff = StructuredDiff::empty(DiffCategory::Ordering, expected, actual);
        diff.matching_rows = expected.row_count();
        return diff;
    }

    let mut diff = StructuredDiff::empty(DiffCategory::Values, expected, actual);
    diff.matching_rows = matched.matched_count();
    diff.modified_rows = matched.unmatched_expected.len();
    diff.sample_modified = matched
        .unmatched_expected
        .iter()
        .zip(matched.unmatched_actual.iter())
        .take(config.max_samples)
        .map(|(&e, &a)| ModifiedRow {
            expected: expected.rows[e].clone(),
            actual: actual.rows[a].clone(),
        })
        .collect();
    diff
}

fn compare_different_length(
    expected: &ResultSet,
    actual: &ResultSet,
    config: &DiffConfig,
) -> StructuredDiff {
    let matched = match_unordered(&expected.rows, &actual.rows, config.float_tolerance);

    let added = matched.unmatched_actual.len();
    let removed = matched.unmatched_expected.len();

    // Differing counts guarantee at least one side has leftovers
    let category = if added > 0 && removed > 0 {
        DiffCategory::Multiple
    } else {
        DiffCategory::RowCount
    };

    let mut diff = StructuredDiff::empty(category, expected, actual);
    diff.matching_rows = matched.matched_count();
    diff.added_rows = added;
    diff.removed_rows = removed;
    diff.sample_added = sample_rows(&actual.rows, &matched.unmatched_actual, config.max_samples);
    diff.sample_removed = sample_rows(&expected.rows, &matched.unmatched_expected, config.max_samples);
    diff
}

fn sample_rows(rows: &[Row], indices: &[usize], max_samples: usize) -> Vec<Row> {
    indices
        .iter()
        .take(max_samples)
        .map(|&idx| rows[idx].clone())
        .collect()
}
