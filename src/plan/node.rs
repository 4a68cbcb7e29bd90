//! Decoded EXPLAIN plan tree
//!
//! Mirrors one node of PostgreSQL's `EXPLAIN (FORMAT JSON)` output. Only the
//! fields the analyzers read are kept; everything else in the JSON is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while decoding EXPLAIN output
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid EXPLAIN JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No plan node found at the root of the EXPLAIN output")]
    MissingRoot,

    #[error("Malformed plan node: {0}")]
    Malformed(String),
}

/// Result type for plan decoding
pub type Result<T> = std::result::Result<T, PlanError>;

/// One physical operator in a plan tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanNode {
    #[serde(rename = "Node Type")]
    pub node_type: String,

    #[serde(rename = "Relation Name", default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,

    #[serde(rename = "Alias", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(rename = "Index Name", default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    #[serde(rename = "Index Cond", default, skip_serializing_if = "Option::is_none")]
    pub index_cond: Option<String>,

    #[serde(rename = "Filter", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(rename = "Join Type", default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<String>,

    #[serde(rename = "Startup Cost", default, skip_serializing_if = "Option::is_none")]
    pub startup_cost: Option<f64>,

    #[serde(rename = "Total Cost", default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,

    #[serde(rename = "Plan Rows", default, skip_serializing_if = "Option::is_none")]
    pub plan_rows: Option<f64>,

    #[serde(rename = "Actual Rows", default, skip_serializing_if = "Option::is_none")]
    pub actual_rows: Option<f64>,

    #[serde(rename = "Actual Loops", default, skip_serializing_if = "Option::is_none")]
    pub actual_loops: Option<f64>,

    #[serde(rename = "Shared Hit Blocks", default, skip_serializing_if = "Option::is_none")]
    pub shared_hit_blocks: Option<u64>,

    #[serde(rename = "Shared Read Blocks", default, skip_serializing_if = "Option::is_none")]
    pub shared_read_blocks: Option<u64>,

    #[serde(rename = "Plans", default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<PlanNode>,
}

impl PlanNode {
    /// Create a node with only a type name
    pub fn new(node_type: impl Into<String>) -> Self {
        let mut node = Self::default();
        node.node_type = node_type.into();
        node
    }

    /// Set the scanned relation
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation_name = Some(relation.into());
        self
    }

    /// Set the index name and condition
    pub fn with_index(mut self, index: impl Into<String>, cond: impl Into<String>) -> Self {
        self.index_name = Some(index.into());
        self.index_cond = Some(cond.into());
        self
    }

    /// Set the filter expression
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the total cost estimate
    pub fn with_total_cost(mut self, cost: f64) -> Self {
        self.total_cost = Some(cost);
        self
    }

    /// Append a child node
    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.plans.push(child);
        self
    }

    /// Shared buffers touched by this node and its children
    ///
    /// `None` when the plan was captured without `BUFFERS`.
    pub fn total_buffers(&self) -> Option<u64> {
        match (self.shared_hit_blocks, self.shared_read_blocks) {
            (None, None) => None,
            (hit, read) => Some(hit.unwrap_or(0) + read.unwrap_or(0)),
        }
    }

    /// Decode the root node from EXPLAIN JSON
    ///
    /// Accepts the shapes PostgreSQL emits: `[{"Plan": {...}}]`,
    /// `{"Plan": {...}}`, or a bare node object.
    ///
    /// # Example
    /// ```
    /// use querydrift::plan::PlanNode;
    /// use serde_json::json;
    ///
    /// let explain = json!([{"Plan": {"Node Type": "Seq Scan", "Relation Name": "users"}}]);
    /// let root = PlanNode::from_explain_json(&explain).unwrap();
    /// assert_eq!(root.node_type, "Seq Scan");
    /// ```
    pub fn from_explain_json(explain: &Value) -> Result<Self> {
        let root = locate_root(explain).ok_or(PlanError::MissingRoot)?;
        PlanNode::deserialize(serde_stacker::Deserializer::new(root))
            .map_err(|e| PlanError::Malformed(e.to_string()))
    }

    /// Parse EXPLAIN JSON text and decode the root node
    pub fn from_explain_str(explain: &str) -> Result<Self> {
        let value = parse_explain(explain)?;
        let plan = Self::from_explain_json(&value);
        release(value);
        plan
    }
}

// Derived drop glue recurses once per nesting level
impl Drop for PlanNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.plans);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.plans);
        }
    }
}

/// Parse EXPLAIN JSON text of any nesting depth
///
/// Left-deep joins over many tables nest far beyond serde_json's default
/// recursion limit, so the limit is lifted and the stack grows on demand.
pub fn parse_explain(explain: &str) -> Result<Value> {
    let mut de = serde_json::Deserializer::from_str(explain);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

/// Drop a JSON tree with an explicit stack
fn release(value: Value) {
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        match value {
            Value::Array(items) => pending.extend(items),
            Value::Object(map) => pending.extend(map.into_iter().map(|(_, v)| v)),
            _ => {}
        }
    }
}

fn locate_root(explain: &Value) -> Option<&Value> {
    let candidate = match explain {
        Value::Array(items) => items.first().map(|item| item.get("Plan").unwrap_or(item))?,
        Value::Object(map) => map.get("Plan").unwrap_or(explain),
        _ => return None,
    };

    candidate
        .get("Node Type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(|_| candidate)
}
