// Plan Regression Detection and Verdicts
//
// Compares a query's fresh EXPLAIN plan with its stored baseline:
//
// - detector: classifies scan, join and sort changes by kind and severity,
//   each with ordered remediation steps
// - cost: percentage comparison of planner cost or shared buffers
// - verdict: combines both with quality warnings into pass/fail
//
// A critical regression (an index scan replaced by a sequential scan) fails
// the verdict even when cost went down. Planner costs are estimates and
// can improve on paper while the access method gets worse.

mod config;
mod cost;
mod detector;
mod verdict;

pub use config::VerdictThresholds;
pub use cost::{compare_buffers, compare_cost, CostComparison};
pub use detector::{detect_regressions, has_plan_changed, likely_cause, PlanRegression, RegressionKind};
pub use verdict::{
    assess_plan, MetricComparison, MetricKind, PlanBaseline, PlanObservation, PlanVerdict,
};
