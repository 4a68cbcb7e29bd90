// Plan verdict assembly
//
// This module integrates:
// - Cost/buffer comparison against the baseline (threshold in percent)
// - Plan regression detection (when the baseline carries a signature)
// - Quality analysis of the current plan (always)
//
// to produce a pass/fail verdict. A critical regression fails the verdict
// even when the numbers look fine: synthetic costs can mislead, a change in
// scan method cannot.

use crate::analysis::{PlanCostInfo, PlanQualityAnalyzer, PlanWarning};
use crate::config::QueryOptions;
use crate::plan::{PlanNode, PlanSignature};
use crate::regression::config::VerdictThresholds;
use crate::regression::cost::{compare_buffers, compare_cost, CostComparison};
use crate::regression::detector::{detect_regressions, has_plan_changed, likely_cause, PlanRegression};
use serde::{Deserialize, Serialize};

/// Stored reference for one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanBaseline {
    pub cost: Option<f64>,
    pub buffers: Option<u64>,
    pub signature: Option<PlanSignature>,
}

/// Fresh measurement for one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanObservation {
    pub cost: Option<f64>,
    pub buffers: Option<u64>,
    pub signature: PlanSignature,
    pub cost_info: PlanCostInfo,
}

impl PlanObservation {
    /// Build an observation from a decoded plan tree
    pub fn from_plan(root: &PlanNode) -> Self {
        let cost_info = PlanCostInfo::from_plan(root);
        Self {
            cost: cost_info.total_cost,
            buffers: cost_info.total_buffers,
            signature: PlanSignature::extract(root),
            cost_info,
        }
    }
}

impl PlanBaseline {
    /// Capture the current observation as a future baseline
    pub fn from_observation(observation: &PlanObservation) -> Self {
        Self {
            cost: observation.cost,
            buffers: observation.buffers,
            signature: Some(observation.signature.clone()),
        }
    }
}

/// Which figure the threshold was applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Buffers,
    Cost,
}

/// Threshold comparison of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: MetricKind,
    pub baseline: f64,
    pub actual: f64,
    #[serde(flatten)]
    pub comparison: CostComparison,
}

/// Final verdict for one query's plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanVerdict {
    pub passed: bool,

    /// None when neither buffers nor cost are known on both sides
    pub metric: Option<MetricComparison>,

    pub plan_changed: bool,
    pub regressions: Vec<PlanRegression>,
    pub warnings: Vec<PlanWarning>,

    /// Generic hint when the plan changed but no specific regression fired
    pub likely_cause: Option<String>,
}

impl PlanVerdict {
    pub fn has_critical_regression(&self) -> bool {
        self.regressions.iter().any(PlanRegression::is_critical)
    }
}

/// Assess a fresh plan against its baseline
///
/// Buffers are preferred over cost when both sides report them, since
/// they measure work actually done rather than a planner estimate.
///
/// # Example
/// ```
/// use querydrift::config::QueryOptions;
/// use querydrift::plan::PlanNode;
/// use querydrift::regression::{assess_plan, PlanBaseline, PlanObservation, VerdictThresholds};
///
/// let before = PlanObservation::from_plan(
///     &PlanNode::new("Index Scan")
///         .with_relation("users")
///         .with_index("users_pkey", "(id = 1)")
///         .with_total_cost(8.0),
/// );
/// let baseline = PlanBaseline::from_observation(&before);
///
/// // Cheaper on paper, but the index is gone
/// let after = PlanObservation::from_plan(
///     &PlanNode::new("Seq Scan").with_relation("users").with_total_cost(4.0),
/// );
///
/// let verdict = assess_plan(&baseline, &after, &VerdictThresholds::default(), &QueryOptions::default(), &[]);
/// assert!(!verdict.passed);
/// assert!(verdict.has_critical_regression());
/// ```
pub fn assess_plan(
    baseline: &PlanBaseline,
    current: &PlanObservation,
    thresholds: &VerdictThresholds,
    options: &QueryOptions,
    ignored_tables: &[String],
) -> PlanVerdict {
    let metric = compare_metric(baseline, current, thresholds.cost_threshold_pct);
    let metric_ok = metric.map_or(true, |m| m.comparison.ok);

    let (regressions, plan_changed, cause) = match &baseline.signature {
        Some(old) => {
            let regressions = detect_regressions(old, &current.signature);
            let changed = has_plan_changed(old, &current.signature);
            let cause = likely_cause(old, &current.signature, &regressions);
            (regressions, changed, cause)
        }
        None => (Vec::new(), false, None),
    };

    let warnings = PlanQualityAnalyzer::default().analyze(
        &current.signature,
        options,
        ignored_tables,
        &current.cost_info,
    );

    let critical = regressions.iter().any(PlanRegression::is_critical);
    let passed = metric_ok && !critical;

    if critical && metric_ok {
        tracing::warn!("critical plan regression overrides passing cost comparison");
    }
    tracing::debug!(
        passed,
        plan_changed,
        regressions = regressions.len(),
        warnings = warnings.len(),
        "plan verdict assembled"
    );

    PlanVerdict {
        passed,
        metric,
        plan_changed,
        regressions,
        warnings,
        likely_cause: cause,
    }
}

fn compare_metric(
    baseline: &PlanBaseline,
    current: &PlanObservation,
    threshold_pct: f64,
) -> Option<MetricComparison> {
    if let (Some(old), Some(new)) = (baseline.buffers, current.buffers) {
        return Some(MetricComparison {
            metric: MetricKind::Buffers,
            baseline: old as f64,
            actual: new as f64,
            comparison: compare_buffers(new, old, threshold_pct),
        });
    }

    if let (Some(old), Some(new)) = (baseline.cost, current.cost) {
        return Some(MetricComparison {
            metric: MetricKind::Cost,
            baseline: old,
            actual: new,
            comparison: compare_cost(new, old, threshold_pct),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::WarningKind;
    use crate::regression::detector::RegressionKind;

    fn index_plan(cost: f64) -> PlanNode {
        PlanNode::new("Index Scan")
            .with_relation("orders")
            .with_index("orders_customer_idx", "(customer_id = 7)")
            .with_total_cost(cost)
    }

    fn seq_plan(cost: f64) -> PlanNode {
        PlanNode::new("Seq Scan").with_relation("orders").with_total_cost(cost)
    }

    fn assess(baseline: &PlanBaseline, current: &PlanObservation) -> PlanVerdict {
        assess_plan(
            baseline,
            current,
            &VerdictThresholds::default(),
            &QueryOptions::default(),
            &[],
        )
    }

    #[test]
    fn test_unchanged_plan_passes() {
        let observation = PlanObservation::from_plan(&index_plan(40.0));
        let baseline = PlanBaseline::from_observation(&observation);

        let verdict = assess(&baseline, &observation);
        assert!(verdict.passed);
        assert!(!verdict.plan_changed);
        assert!(verdict.regressions.is_empty());
        assert!(verdict.likely_cause.is_none());
        assert_eq!(verdict.metric.map(|m| m.metric), Some(MetricKind::Cost));
    }

    #[test]
    fn test_cost_over_threshold_fails() {
        let baseline = PlanBaseline::from_observation(&PlanObservation::from_plan(&index_plan(40.0)));
        let current = PlanObservation::from_plan(&index_plan(60.0));

        let verdict = assess(&baseline, &current);
        assert!(!verdict.passed);
        let metric = verdict.metric.unwrap();
        assert_eq!(metric.comparison.pct_increase, Some(50.0));
        assert!(verdict.regressions.is_empty());
    }

    #[test]
    fn test_critical_regression_overrides_cheaper_cost() {
        let baseline = PlanBaseline::from_observation(&PlanObservation::from_plan(&index_plan(400.0)));
        let current = PlanObservation::from_plan(&seq_plan(300.0));

        let verdict = assess(&baseline, &current);
        assert!(verdict.metric.unwrap().comparison.ok);
        assert!(!verdict.passed);
        assert!(verdict.plan_changed);
        assert_eq!(verdict.regressions[0].kind, RegressionKind::IndexToSeqscan);
        assert_eq!(verdict.warnings[0].kind, WarningKind::SeqScan);
    }

    #[test]
    fn test_warning_regression_does_not_fail() {
        let baseline = PlanBaseline::from_observation(&PlanObservation::from_plan(&seq_plan(100.0)));
        let current = PlanObservation::from_plan(&index_plan(100.0));

        let verdict = assess(&baseline, &current);
        assert!(verdict.passed);
        assert_eq!(verdict.regressions[0].kind, RegressionKind::TableAccessChanged);
    }

    #[test]
    fn test_buffers_preferred_over_cost() {
        let mut old = index_plan(100.0);
        old.shared_hit_blocks = Some(100);
        let mut new = index_plan(500.0);
        new.shared_hit_blocks = Some(110);

        let baseline = PlanBaseline::from_observation(&PlanObservation::from_plan(&old));
        let verdict = assess(&baseline, &PlanObservation::from_plan(&new));

        let metric = verdict.metric.unwrap();
        assert_eq!(metric.metric, MetricKind::Buffers);
        assert!(metric.comparison.ok);
        assert!(verdict.passed);
    }

    #[test]
    fn test_no_baseline_signature() {
        let baseline = PlanBaseline {
            cost: Some(400.0),
            buffers: None,
            signature: None,
        };
        let current = PlanObservation::from_plan(&seq_plan(300.0));

        let verdict = assess(&baseline, &current);
        assert!(verdict.passed);
        assert!(!verdict.plan_changed);
        assert!(verdict.regressions.is_empty());
        assert_eq!(verdict.warnings.len(), 1);
    }

    #[test]
    fn test_no_comparable_metric() {
        let baseline = PlanBaseline::default();
        let current = PlanObservation::from_plan(&PlanNode::new("Result"));

        let verdict = assess(&baseline, &current);
        assert!(verdict.metric.is_none());
        assert!(verdict.passed);
    }

    #[test]
    fn test_zero_cost_baseline() {
        let baseline = PlanBaseline {
            cost: Some(0.0),
            ..PlanBaseline::default()
        };
        let current = PlanObservation::from_plan(&PlanNode::new("Result").with_total_cost(0.01));

        let verdict = assess(&baseline, &current);
        assert!(!verdict.passed);
        assert_eq!(verdict.metric.unwrap().comparison.pct_increase, None);
    }

    #[test]
    fn test_verdict_serializes_flat_metric() {
        let baseline = PlanBaseline::from_observation(&PlanObservation::from_plan(&index_plan(40.0)));
        let verdict = assess(&baseline, &PlanObservation::from_plan(&index_plan(50.0)));

        let encoded = serde_json::to_value(&verdict).unwrap();
        assert_eq!(encoded["metric"]["metric"], "cost");
        assert_eq!(encoded["metric"]["ok"], false);
        assert_eq!(encoded["metric"]["pct_increase"], 25.0);

        let decoded: PlanVerdict = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, verdict);
    }
}
