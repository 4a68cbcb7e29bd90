//! EXPLAIN plan decoding and signature extraction

mod node;
mod signature;

pub use node::{parse_explain, PlanError, PlanNode, Result};
pub use signature::{
    is_index_scan_type, PlanSignature, ScanInfo, BITMAP_INDEX_SCAN, INDEX_ONLY_SCAN, INDEX_SCAN,
    NESTED_LOOP, SEQ_SCAN, SORT,
};
