// Integration test utilities
//
// Fixture loading for EXPLAIN plans and opt-in tracing output
// (RUST_LOG=querydrift=debug cargo test -- --nocapture).

#![allow(dead_code)]

use querydrift::plan::PlanNode;
use querydrift::regression::PlanObservation;
use std::path::PathBuf;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/plans")
        .join(name)
}

/// Decode a plan fixture from tests/fixtures/plans
pub fn load_plan(name: &str) -> PlanNode {
    let path = fixture_path(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    PlanNode::from_explain_str(&content)
        .unwrap_or_else(|e| panic!("Failed to decode {}: {}", path.display(), e))
}

/// Decode a plan fixture into an observation
pub fn observe(name: &str) -> PlanObservation {
    PlanObservation::from_plan(&load_plan(name))
}
