// Plan regression detection
//
// Compares a baseline plan signature with the current one and classifies
// every change in execution strategy:
//
// | Change                                  | Kind                  | Severity |
// |-----------------------------------------|-----------------------|----------|
// | index-family scan → Seq Scan            | index_to_seqscan      | critical |
// | Index Only Scan → Index Scan            | index_only_to_index   | warning  |
// | index-family, different index           | index_changed         | info     |
// | any other scan type change              | table_access_changed  | warning  |
// | join sequence changed                   | join_type_changed     | info     |
// | Sort appeared                           | sort_added            | warning  |
//
// Only relations present in both signatures are compared. A relation that
// disappeared from the current plan is not a regression signal here.

use crate::plan::{PlanSignature, ScanInfo, INDEX_ONLY_SCAN, INDEX_SCAN, SEQ_SCAN};
use crate::severity::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Kind of plan regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionKind {
    IndexToSeqscan,
    IndexOnlyToIndex,
    IndexChanged,
    TableAccessChanged,
    JoinTypeChanged,
    SortAdded,
}

impl RegressionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegressionKind::IndexToSeqscan => "index_to_seqscan",
            RegressionKind::IndexOnlyToIndex => "index_only_to_index",
            RegressionKind::IndexChanged => "index_changed",
            RegressionKind::TableAccessChanged => "table_access_changed",
            RegressionKind::JoinTypeChanged => "join_type_changed",
            RegressionKind::SortAdded => "sort_added",
        }
    }
}

impl std::fmt::Display for RegressionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected change in how a query executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRegression {
    pub kind: RegressionKind,

    /// Relation involved (None for join and sort changes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Baseline scan type (or join sequence)
    #[serde(default)]
    pub old_scan: String,

    /// Current scan type (or join sequence)
    #[serde(default)]
    pub new_scan: String,

    /// Baseline index name, when one was used
    #[serde(default)]
    pub index_name: String,

    /// Baseline index condition, when one was used
    #[serde(default)]
    pub index_cond: String,

    pub severity: Severity,
    pub message: String,

    /// Ordered remediation steps
    #[serde(default)]
    pub remediation: Vec<String>,
}

impl PlanRegression {
    fn new(kind: RegressionKind, severity: Severity, message: String) -> Self {
        Self {
            kind,
            table: None,
            old_scan: String::new(),
            new_scan: String::new(),
            index_name: String::new(),
            index_cond: String::new(),
            severity,
            message,
            remediation: Vec::new(),
        }
    }

    fn for_table(
        kind: RegressionKind,
        severity: Severity,
        table: &str,
        old: &ScanInfo,
        new: &ScanInfo,
        message: String,
    ) -> Self {
        Self {
            table: Some(table.to_string()),
            old_scan: old.scan_type.clone(),
            new_scan: new.scan_type.clone(),
            index_name: old.index_name.clone(),
            index_cond: old.index_cond.clone(),
            ..Self::new(kind, severity, message)
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Compare two plan signatures
///
/// Output order is deterministic: per-relation findings in relation name
/// order, then the join comparison, then the sort comparison.
///
/// # Example
/// ```
/// use querydrift::plan::{PlanNode, PlanSignature};
/// use querydrift::regression::{detect_regressions, RegressionKind};
/// use querydrift::Severity;
///
/// let baseline = PlanSignature::extract(
///     &PlanNode::new("Index Scan").with_relation("users").with_index("users_email_idx", "(email = 'a')"),
/// );
/// let current = PlanSignature::extract(&PlanNode::new("Seq Scan").with_relation("users"));
///
/// let regressions = detect_regressions(&baseline, &current);
/// assert_eq!(regressions.len(), 1);
/// assert_eq!(regressions[0].kind, RegressionKind::IndexToSeqscan);
/// assert_eq!(regressions[0].severity, Severity::Critical);
/// ```
pub fn detect_regressions(baseline: &PlanSignature, current: &PlanSignature) -> Vec<PlanRegression> {
    let mut regressions = Vec::new();

    // BTreeMap iteration is already in relation name order
    for (table, old) in &baseline.relations {
        let Some(new) = current.relations.get(table) else {
            continue;
        };
        if let Some(regression) = compare_scan(table, old, new) {
            regressions.push(regression);
        }
    }

    if let Some(regression) = compare_joins(baseline, current) {
        regressions.push(regression);
    }

    if !baseline.has_sort && current.has_sort {
        let mut regression = PlanRegression::new(
            RegressionKind::SortAdded,
            Severity::Warning,
            "A Sort node was added to the plan".to_string(),
        );
        regression.remediation = vec![
            "Check whether an index that used to provide the required order was dropped or is no longer chosen".to_string(),
            "Consider an index matching the ORDER BY columns, or raise work_mem if the sort spills to disk".to_string(),
        ];
        regressions.push(regression);
    }

    for regression in &regressions {
        tracing::debug!(
            kind = %regression.kind,
            severity = %regression.severity,
            table = regression.table.as_deref().unwrap_or("-"),
            "plan regression detected"
        );
    }

    regressions
}

fn compare_scan(table: &str, old: &ScanInfo, new: &ScanInfo) -> Option<PlanRegression> {
    if old.is_index_scan() && new.scan_type == SEQ_SCAN {
        let message = if old.index_name.is_empty() {
            format!("{table}: {} replaced by Seq Scan", old.scan_type)
        } else {
            format!(
                "{table}: {} using {} replaced by Seq Scan",
                old.scan_type, old.index_name
            )
        };
        let mut regression = PlanRegression::for_table(
            RegressionKind::IndexToSeqscan,
            Severity::Critical,
            table,
            old,
            new,
            message,
        );
        regression.remediation = index_lost_remediation(table, old);
        return Some(regression);
    }

    if old.scan_type == INDEX_ONLY_SCAN && new.scan_type == INDEX_SCAN {
        let mut regression = PlanRegression::for_table(
            RegressionKind::IndexOnlyToIndex,
            Severity::Warning,
            table,
            old,
            new,
            format!("{table}: Index Only Scan degraded to Index Scan (heap fetches required)"),
        );
        regression.remediation = vec![format!(
            "Update the visibility map so index-only scans are possible again: VACUUM ANALYZE {table};"
        )];
        if !old.index_name.is_empty() {
            regression
                .remediation
                .push(format!("Optionally rebuild a bloated index: REINDEX INDEX {};", old.index_name));
        }
        return Some(regression);
    }

    if old.is_index_scan()
        && new.is_index_scan()
        && !old.index_name.is_empty()
        && !new.index_name.is_empty()
        && old.index_name != new.index_name
    {
        let mut regression = PlanRegression::for_table(
            RegressionKind::IndexChanged,
            Severity::Info,
            table,
            old,
            new,
            format!(
                "{table}: index changed from {} to {}",
                old.index_name, new.index_name
            ),
        );
        regression.remediation = vec![format!(
            "Refresh planner statistics if the new index is unexpected: ANALYZE {table};"
        )];
        return Some(regression);
    }

    if old.scan_type != new.scan_type {
        let mut regression = PlanRegression::for_table(
            RegressionKind::TableAccessChanged,
            Severity::Warning,
            table,
            old,
            new,
            format!(
                "{table}: access method changed from {} to {}",
                old.scan_type, new.scan_type
            ),
        );
        regression.remediation = vec![format!("Refresh planner statistics: ANALYZE {table};")];
        return Some(regression);
    }

    None
}

fn compare_joins(baseline: &PlanSignature, current: &PlanSignature) -> Option<PlanRegression> {
    if baseline.join_types == current.join_types {
        return None;
    }

    let old = join_sequence(&baseline.join_types);
    let new = join_sequence(&current.join_types);

    let mut regression = PlanRegression::new(
        RegressionKind::JoinTypeChanged,
        Severity::Info,
        format!("Join strategy changed from [{old}] to [{new}]"),
    );
    regression.old_scan = old;
    regression.new_scan = new;
    regression.remediation = vec![
        "Refresh planner statistics on the joined tables with ANALYZE and compare row estimates".to_string(),
    ];
    Some(regression)
}

fn join_sequence(joins: &[String]) -> String {
    if joins.is_empty() {
        "none".to_string()
    } else {
        joins.join(", ")
    }
}

fn index_lost_remediation(table: &str, old: &ScanInfo) -> Vec<String> {
    let index = if old.index_name.is_empty() {
        "the index".to_string()
    } else {
        old.index_name.clone()
    };

    let mut steps = vec![
        format!(
            "Check whether {index} still exists: SELECT indexname, indexdef FROM pg_indexes WHERE tablename = '{table}';"
        ),
        format!(
            "Check statistics freshness: SELECT last_analyze, last_autoanalyze, n_live_tup, n_dead_tup FROM pg_stat_user_tables WHERE relname = '{table}';"
        ),
        format!("Refresh planner statistics: ANALYZE {table};"),
    ];

    match equality_column(&old.index_cond) {
        Some(column) => {
            let name = if old.index_name.is_empty() {
                format!("{table}_{column}_idx")
            } else {
                old.index_name.clone()
            };
            steps.push(format!(
                "If the index is missing, recreate it: CREATE INDEX IF NOT EXISTS {name} ON {table} ({column});"
            ));
        }
        None => steps.push(format!(
            "If the index is missing, recreate {index} from its original definition (pg_indexes.indexdef in the baseline database)"
        )),
    }

    steps
}

/// Extract the column of a single-column equality condition like `(id = 42)`
fn equality_column(index_cond: &str) -> Option<String> {
    static EQUALITY: OnceLock<Option<Regex>> = OnceLock::new();

    EQUALITY
        .get_or_init(|| Regex::new(r"\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*=").ok())
        .as_ref()?
        .captures(index_cond)
        .map(|caps| caps[1].to_string())
}

/// Coarse "did the plan shape change" signal
///
/// True when the relation counts differ, any shared relation changed its
/// scan type or index, or the join sequence changed.
pub fn has_plan_changed(baseline: &PlanSignature, current: &PlanSignature) -> bool {
    if baseline.relations.len() != current.relations.len() {
        return true;
    }

    let access_changed = baseline.relations.iter().any(|(table, old)| {
        current
            .relations
            .get(table)
            .is_some_and(|new| old.scan_type != new.scan_type || old.index_name != new.index_name)
    });

    access_changed || baseline.join_types != current.join_types
}

/// Generic hint for a changed plan that no specific rule explains
pub fn likely_cause(
    baseline: &PlanSignature,
    current: &PlanSignature,
    regressions: &[PlanRegression],
) -> Option<String> {
    if !regressions.is_empty() || !has_plan_changed(baseline, current) {
        return None;
    }

    Some(
        "Execution plan shape changed; likely stale statistics or a data volume shift. \
         Run ANALYZE on the involved tables and compare EXPLAIN output."
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanNode;

    fn index_scan(table: &str, index: &str, cond: &str) -> PlanNode {
        PlanNode::new("Index Scan").with_relation(table).with_index(index, cond)
    }

    #[test]
    fn test_identical_signatures_no_regressions() {
        let sig = PlanSignature::extract(
            &PlanNode::new("Nested Loop")
                .with_child(index_scan("a", "a_pkey", "(id = 1)"))
                .with_child(PlanNode::new("Seq Scan").with_relation("b")),
        );
        assert!(detect_regressions(&sig, &sig).is_empty());
        assert!(!has_plan_changed(&sig, &sig));
    }

    #[test]
    fn test_index_to_seqscan_remediation() {
        let baseline = PlanSignature::extract(&index_scan("users", "users_email_idx", "(email = 'x'::text)"));
        let current = PlanSignature::extract(&PlanNode::new("Seq Scan").with_relation("users"));

        let regressions = detect_regressions(&baseline, &current);
        assert_eq!(regressions.len(), 1);

        let r = &regressions[0];
        assert_eq!(r.kind, RegressionKind::IndexToSeqscan);
        assert!(r.is_critical());
        assert_eq!(r.table.as_deref(), Some("users"));
        assert_eq!(r.old_scan, "Index Scan");
        assert_eq!(r.new_scan, "Seq Scan");
        assert_eq!(r.index_name, "users_email_idx");
        assert_eq!(r.remediation.len(), 4);
        assert!(r.remediation[0].contains("pg_indexes"));
        assert!(r.remediation[1].contains("pg_stat_user_tables"));
        assert!(r.remediation[2].contains("ANALYZE users"));
        assert_eq!(
            r.remediation[3],
            "If the index is missing, recreate it: CREATE INDEX IF NOT EXISTS users_email_idx ON users (email);"
        );
    }

    #[test]
    fn test_index_to_seqscan_unparseable_condition() {
        let baseline = PlanSignature::extract(&index_scan(
            "users",
            "users_lower_email_idx",
            "(lower((email)::text) = 'x'::text)",
        ));
        let current = PlanSignature::extract(&PlanNode::new("Seq Scan").with_relation("users"));

        let regressions = detect_regressions(&baseline, &current);
        assert!(regressions[0].remediation[3].contains("original definition"));
    }

    #[test]
    fn test_bitmap_index_scan_to_seqscan_is_critical() {
        let baseline = PlanSignature::extract(
            &PlanNode::new("Bitmap Heap Scan").with_child(
                PlanNode::new("Bitmap Index Scan")
                    .with_relation("logs")
                    .with_index("logs_ts_idx", "(ts = now())"),
            ),
        );
        let current = PlanSignature::extract(&PlanNode::new("Seq Scan").with_relation("logs"));

        let regressions = detect_regressions(&baseline, &current);
        assert_eq!(regressions[0].kind, RegressionKind::IndexToSeqscan);
    }

    #[test]
    fn test_bitmap_heap_scan_to_seqscan_is_access_change() {
        // PostgreSQL reports the relation on the heap node, not the index node
        let baseline = PlanSignature::extract(
            &PlanNode::new("Bitmap Heap Scan").with_relation("logs").with_child(
                PlanNode::new("Bitmap Index Scan").with_index("logs_ts_idx", "(ts = now())"),
            ),
        );
        let current = PlanSignature::extract(&PlanNode::new("Seq Scan").with_relation("logs"));

        let regressions = detect_regressions(&baseline, &current);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].kind, RegressionKind::TableAccessChanged);
        assert_eq!(regressions[0].severity, Severity::Warning);
        assert_eq!(regressions[0].old_scan, "Bitmap Heap Scan");
    }

    #[test]
    fn test_index_only_to_index() {
        let baseline = PlanSignature::extract(
            &PlanNode::new("Index Only Scan").with_relation("t").with_index("t_idx", "(a = 1)"),
        );
        let current = PlanSignature::extract(&index_scan("t", "t_idx", "(a = 1)"));

        let regressions = detect_regressions(&baseline, &current);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].kind, RegressionKind::IndexOnlyToIndex);
        assert_eq!(regressions[0].severity, Severity::Warning);
        assert!(regressions[0].remediation[0].contains("VACUUM ANALYZE t"));
        assert!(regressions[0].remediation[1].contains("REINDEX INDEX t_idx"));
    }

    #[test]
    fn test_index_changed() {
        let baseline = PlanSignature::extract(&index_scan("t", "t_a_idx", "(a = 1)"));
        let current = PlanSignature::extract(&index_scan("t", "t_ab_idx", "(a = 1)"));

        let regressions = detect_regressions(&baseline, &current);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].kind, RegressionKind::IndexChanged);
        assert_eq!(regressions[0].severity, Severity::Info);
        assert!(has_plan_changed(&baseline, &current));
    }

    #[test]
    fn test_table_access_changed() {
        let baseline = PlanSignature::extract(&PlanNode::new("Seq Scan").with_relation("t"));
        let current = PlanSignature::extract(&index_scan("t", "t_idx", "(a = 1)"));

        let regressions = detect_regressions(&baseline, &current);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].kind, RegressionKind::TableAccessChanged);
        assert_eq!(regressions[0].severity, Severity::Warning);
    }

    #[test]
    fn test_dropped_relation_skipped() {
        let baseline = PlanSignature::extract(
            &PlanNode::new("Hash Join")
                .with_child(index_scan("a", "a_pkey", "(id = 1)"))
                .with_child(PlanNode::new("Seq Scan").with_relation("b")),
        );
        let current = PlanSignature::extract(
            &PlanNode::new("Hash Join").with_child(index_scan("a", "a_pkey", "(id = 1)")),
        );

        assert!(detect_regressions(&baseline, &current).is_empty());
        assert!(has_plan_changed(&baseline, &current));
    }

    #[test]
    fn test_join_type_changed() {
        let baseline = PlanSignature::extract(&PlanNode::new("Hash Join"));
        let current = PlanSignature::extract(&PlanNode::new("Nested Loop"));

        let regressions = detect_regressions(&baseline, &current);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].kind, RegressionKind::JoinTypeChanged);
        assert_eq!(regressions[0].old_scan, "Hash Join");
        assert_eq!(regressions[0].new_scan, "Nested Loop");
        assert!(regressions[0].table.is_none());
    }

    #[test]
    fn test_sort_added_not_removed() {
        let unsorted = PlanSignature::extract(&PlanNode::new("Seq Scan"));
        let sorted = PlanSignature::extract(&PlanNode::new("Sort").with_child(PlanNode::new("Seq Scan")));

        let added = detect_regressions(&unsorted, &sorted);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].kind, RegressionKind::SortAdded);
        assert_eq!(added[0].severity, Severity::Warning);

        assert!(detect_regressions(&sorted, &unsorted).is_empty());
    }

    #[test]
    fn test_ordering_relations_then_join_then_sort() {
        let baseline = PlanSignature::extract(
            &PlanNode::new("Hash Join")
                .with_child(index_scan("zeta", "zeta_pkey", "(id = 1)"))
                .with_child(index_scan("alpha", "alpha_pkey", "(id = 1)")),
        );
        let current = PlanSignature::extract(
            &PlanNode::new("Sort").with_child(
                PlanNode::new("Nested Loop")
                    .with_child(PlanNode::new("Seq Scan").with_relation("zeta"))
                    .with_child(PlanNode::new("Seq Scan").with_relation("alpha")),
            ),
        );

        let kinds: Vec<_> = detect_regressions(&baseline, &current)
            .into_iter()
            .map(|r| (r.kind, r.table))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (RegressionKind::IndexToSeqscan, Some("alpha".to_string())),
                (RegressionKind::IndexToSeqscan, Some("zeta".to_string())),
                (RegressionKind::JoinTypeChanged, None),
                (RegressionKind::SortAdded, None),
            ]
        );
    }

    #[test]
    fn test_equality_column() {
        assert_eq!(equality_column("(id = 42)"), Some("id".to_string()));
        assert_eq!(equality_column("(customer_id = $1)"), Some("customer_id".to_string()));
        assert_eq!(equality_column("((email)::text = 'x'::text)"), None);
        assert_eq!(equality_column(""), None);
    }

    #[test]
    fn test_likely_cause() {
        let a = PlanSignature::extract(&PlanNode::new("Seq Scan").with_relation("a"));
        let ab = PlanSignature::extract(
            &PlanNode::new("Append")
                .with_child(PlanNode::new("Seq Scan").with_relation("a"))
                .with_child(PlanNode::new("Seq Scan").with_relation("b")),
        );

        assert!(likely_cause(&a, &a, &[]).is_none());
        let regressions = detect_regressions(&a, &ab);
        assert!(regressions.is_empty());
        assert!(likely_cause(&a, &ab, &regressions).is_some());
    }
}
