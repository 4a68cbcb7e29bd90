// Plan signature extraction
//
// A signature is the part of a plan tree that matters for drift detection:
// which operators ran (pre-order), how each relation was accessed, which
// joins were used, and whether a sequential scan or sort appeared. Costs and
// row counts are deliberately left out so that signatures stay stable across
// runs with different statistics.

use crate::plan::node::{PlanNode, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SEQ_SCAN: &str = "Seq Scan";
pub const INDEX_SCAN: &str = "Index Scan";
pub const INDEX_ONLY_SCAN: &str = "Index Only Scan";
pub const BITMAP_INDEX_SCAN: &str = "Bitmap Index Scan";
pub const SORT: &str = "Sort";
pub const NESTED_LOOP: &str = "Nested Loop";

const JOIN_NODE_TYPES: [&str; 3] = [NESTED_LOOP, "Hash Join", "Merge Join"];

/// How a single relation was accessed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanInfo {
    pub scan_type: String,
    #[serde(default)]
    pub index_name: String,
    #[serde(default)]
    pub index_cond: String,
    #[serde(default)]
    pub filter: String,
}

impl ScanInfo {
    pub fn new(scan_type: impl Into<String>) -> Self {
        Self {
            scan_type: scan_type.into(),
            ..Self::default()
        }
    }

    /// Index, Index Only and Bitmap Index scans
    pub fn is_index_scan(&self) -> bool {
        is_index_scan_type(&self.scan_type)
    }
}

/// Check whether a node type reads through an index
///
/// Only Index Scan, Index Only Scan and Bitmap Index Scan qualify. PostgreSQL
/// reports the relation of a bitmap access on its Bitmap Heap Scan parent, so
/// the relation's recorded scan type is Bitmap Heap Scan and a later switch
/// to Seq Scan is classified as a table access change, not a lost index.
pub fn is_index_scan_type(scan_type: &str) -> bool {
    matches!(scan_type, INDEX_SCAN | INDEX_ONLY_SCAN | BITMAP_INDEX_SCAN)
}

/// Compact, comparable summary of a plan tree
///
/// `relations` keeps one entry per relation name; when a relation is scanned
/// more than once (self-joins, subplans) the last visited scan wins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanSignature {
    pub node_types: Vec<String>,
    pub relations: BTreeMap<String, ScanInfo>,
    pub join_types: Vec<String>,
    #[serde(default)]
    pub indexes_used: Vec<String>,
    pub has_seq_scan: bool,
    pub has_sort: bool,
}

impl PlanSignature {
    /// Walk a plan tree pre-order, depth first
    ///
    /// Uses an explicit stack so deeply nested subplans cannot exhaust the
    /// call stack.
    ///
    /// # Example
    /// ```
    /// use querydrift::plan::{PlanNode, PlanSignature};
    ///
    /// let plan = PlanNode::new("Sort").with_child(PlanNode::new("Seq Scan").with_relation("users"));
    /// let sig = PlanSignature::extract(&plan);
    ///
    /// assert_eq!(sig.node_types, vec!["Sort", "Seq Scan"]);
    /// assert!(sig.has_sort && sig.has_seq_scan);
    /// assert_eq!(sig.relations["users"].scan_type, "Seq Scan");
    /// ```
    pub fn extract(root: &PlanNode) -> Self {
        let mut sig = PlanSignature::default();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            sig.visit(node);
            // Reverse so the first child is popped next
            stack.extend(node.plans.iter().rev());
        }

        tracing::trace!(
            nodes = sig.node_types.len(),
            relations = sig.relations.len(),
            "extracted plan signature"
        );

        sig
    }

    /// Decode EXPLAIN JSON and extract its signature
    pub fn from_explain_json(explain: &Value) -> Result<Self> {
        let root = PlanNode::from_explain_json(explain)?;
        Ok(Self::extract(&root))
    }

    /// Parse EXPLAIN JSON text and extract its signature
    pub fn from_explain_str(explain: &str) -> Result<Self> {
        let root = PlanNode::from_explain_str(explain)?;
        Ok(Self::extract(&root))
    }

    fn visit(&mut self, node: &PlanNode) {
        let node_type = node.node_type.as_str();
        self.node_types.push(node_type.to_string());

        match node_type {
            SEQ_SCAN => self.has_seq_scan = true,
            SORT => self.has_sort = true,
            t if JOIN_NODE_TYPES.contains(&t) => self.join_types.push(t.to_string()),
            _ => {}
        }

        let Some(relation) = node.relation_name.as_deref().filter(|r| !r.is_empty()) else {
            return;
        };

        let index_name = node.index_name.clone().unwrap_or_default();
        if !index_name.is_empty() {
            self.indexes_used.push(index_name.clone());
        }

        self.relations.insert(
            relation.to_string(),
            ScanInfo {
                scan_type: node_type.to_string(),
                index_name,
                index_cond: node.index_cond.clone().unwrap_or_default(),
                filter: node.filter.clone().unwrap_or_default(),
            },
        );
    }

    /// Relations read with a sequential scan, in name order
    pub fn seq_scanned_relations(&self) -> Vec<&str> {
        self.relations
            .iter()
            .filter(|(_, scan)| scan.scan_type == SEQ_SCAN)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Number of Sort nodes
    pub fn sort_count(&self) -> usize {
        self.node_types.iter().filter(|t| *t == SORT).count()
    }

    /// Whether a Nested Loop join appears anywhere
    pub fn has_nested_loop(&self) -> bool {
        self.join_types.iter().any(|t| t == NESTED_LOOP)
    }
}
