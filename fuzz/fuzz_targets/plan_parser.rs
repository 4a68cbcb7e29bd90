#![no_main]

use libfuzzer_sys::fuzz_target;
use querydrift::plan::{PlanNode, PlanSignature};
use querydrift::regression::detect_regressions;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Decoding arbitrary EXPLAIN text must never panic
        if let Ok(plan) = PlanNode::from_explain_str(input) {
            let signature = PlanSignature::extract(&plan);
            let _ = detect_regressions(&signature, &signature);
        }
    }
});
