//! Plan Quality Analysis
//!
//! Flags smells in a single plan signature, without any baseline:
//!
//! - **SeqScan**: one table read with a sequential scan
//! - **MultipleSeqScans**: several tables read with sequential scans
//! - **MultipleSorts**: more than one Sort node
//! - **NestedLoopSeqScan**: a nested loop join alongside a sequential scan
//!
//! Cheap plans are noise: a sequential scan over a ten-page table is the
//! right plan. When the plan's total cost or buffer usage is known to be
//! below the trivial thresholds, scan and join warnings are suppressed.

use crate::config::QueryOptions;
use crate::plan::{PlanNode, PlanSignature};
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// Thresholds below which a plan is considered trivial
#[derive(Debug, Clone, PartialEq)]
pub struct QualityThresholds {
    /// Planner cost units
    /// Default: 10.0
    pub trivial_cost: f64,

    /// Shared buffers (8KB pages)
    /// Default: 10
    pub trivial_buffers: u64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            trivial_cost: 10.0,
            trivial_buffers: 10,
        }
    }
}

/// Cost figures of the analyzed plan, each possibly unavailable
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanCostInfo {
    pub total_cost: Option<f64>,
    pub total_buffers: Option<u64>,
}

impl PlanCostInfo {
    pub fn new(total_cost: Option<f64>, total_buffers: Option<u64>) -> Self {
        Self {
            total_cost,
            total_buffers,
        }
    }

    /// Read cost and buffers from a plan's root node
    pub fn from_plan(root: &PlanNode) -> Self {
        Self {
            total_cost: root.total_cost,
            total_buffers: root.total_buffers(),
        }
    }

    fn is_trivial(&self, thresholds: &QualityThresholds) -> bool {
        self.total_cost.is_some_and(|c| c < thresholds.trivial_cost)
            || self.total_buffers.is_some_and(|b| b < thresholds.trivial_buffers)
    }
}

/// Kind of quality warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    SeqScan,
    MultipleSeqScans,
    MultipleSorts,
    NestedLoopSeqScan,
}

/// A baseline-independent smell in one plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanWarning {
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// One-line fix
    pub suggestion: String,

    /// Longer rationale
    pub details: String,
}

/// Quality analyzer for single plans
#[derive(Debug, Clone, Default)]
pub struct PlanQualityAnalyzer {
    thresholds: QualityThresholds,
}

impl PlanQualityAnalyzer {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Analyze a plan signature for quality smells
    pub fn analyze(
        &self,
        signature: &PlanSignature,
        options: &QueryOptions,
        ignored_tables: &[String],
        cost: &PlanCostInfo,
    ) -> Vec<PlanWarning> {
        let trivial = cost.is_trivial(&self.thresholds);
        if trivial {
            tracing::trace!(?cost, "trivial plan, scan and join warnings suppressed");
        }

        let mut warnings = Vec::new();

        if signature.has_seq_scan && !options.disable_seqscan_warning && !trivial {
            warnings.extend(seq_scan_warning(signature, ignored_tables));
        }

        let sorts = signature.sort_count();
        if sorts > 1 {
            warnings.push(PlanWarning {
                kind: WarningKind::MultipleSorts,
                severity: Severity::Info,
                message: format!("Plan contains {sorts} Sort nodes"),
                table: None,
                suggestion: "Check whether an index or a shared ORDER BY could provide the order once"
                    .to_string(),
                details: "Each Sort node materializes and orders its input. Several sorts in one \
                          plan usually come from ORDER BY combined with DISTINCT, window functions \
                          or merge joins. An index matching the common ordering can remove some \
                          of them; otherwise make sure work_mem is large enough to avoid disk sorts."
                    .to_string(),
            });
        }

        if signature.has_seq_scan && signature.has_nested_loop() && !trivial {
            warnings.push(PlanWarning {
                kind: WarningKind::NestedLoopSeqScan,
                severity: Severity::Warning,
                message: "Nested Loop join combined with a sequential scan".to_string(),
                table: None,
                suggestion: "Index the join columns of the scanned table".to_string(),
                details: "A nested loop re-executes its inner side once per outer row. If the \
                          inner side is a sequential scan the work grows with the product of the \
                          two tables. An index on the join key lets the inner side become an \
                          index scan, or lets the planner choose a hash join instead."
                    .to_string(),
            });
        }

        warnings
    }
}

fn seq_scan_warning(signature: &PlanSignature, ignored_tables: &[String]) -> Option<PlanWarning> {
    let tables: Vec<&str> = signature
        .seq_scanned_relations()
        .into_iter()
        .filter(|t| !ignored_tables.iter().any(|ignored| ignored == t))
        .collect();

    match tables.as_slice() {
        [] => None,
        [table] => Some(PlanWarning {
            kind: WarningKind::SeqScan,
            severity: Severity::Warning,
            message: format!("Sequential scan on {table}"),
            table: Some(table.to_string()),
            suggestion: format!("Add an index on the columns {table} is filtered or joined by"),
            details: format!(
                "A sequential scan reads every page of {table}. That is correct for small tables \
                 or queries that need most rows, but as the table grows every execution pays for \
                 a full read. Check the Filter condition for indexable columns, or add {table} \
                 to ignored_tables if the scan is intended."
            ),
        }),
        many => Some(PlanWarning {
            kind: WarningKind::MultipleSeqScans,
            severity: Severity::Warning,
            message: format!(
                "Sequential scans on {} tables: {}",
                many.len(),
                many.join(", ")
            ),
            table: None,
            suggestion: "Add indexes on the filter and join columns of the scanned tables"
                .to_string(),
            details: "Several tables are read in full. Each sequential scan grows linearly with \
                      its table, so the query slows down as data accumulates. Review the filter \
                      and join conditions on each table for indexable columns."
                .to_string(),
        }),
    }
}

/// Analyze a plan with the default trivial-plan thresholds
///
/// # Example
/// ```
/// use querydrift::analysis::{analyze_plan, PlanCostInfo, WarningKind};
/// use querydrift::config::QueryOptions;
/// use querydrift::plan::{PlanNode, PlanSignature};
///
/// let sig = PlanSignature::extract(&PlanNode::new("Seq Scan").with_relation("events"));
///
/// let cheap = analyze_plan(&sig, &QueryOptions::default(), &[], &PlanCostInfo::new(Some(5.0), None));
/// assert!(cheap.is_empty());
///
/// let costly = analyze_plan(&sig, &QueryOptions::default(), &[], &PlanCostInfo::new(Some(500.0), None));
/// assert_eq!(costly[0].kind, WarningKind::SeqScan);
/// ```
pub fn analyze_plan(
    signature: &PlanSignature,
    options: &QueryOptions,
    ignored_tables: &[String],
    cost: &PlanCostInfo,
) -> Vec<PlanWarning> {
    PlanQualityAnalyzer::default().analyze(signature, options, ignored_tables, cost)
}
