// Cost and buffer threshold comparison
//
// Planner cost and shared-buffer counts are compared against the baseline
// as a percentage increase. A zero baseline is special-cased: the ratio is
// undefined, so only an actual value of zero passes.

use serde::{Deserialize, Serialize};

/// Outcome of comparing one metric against its baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostComparison {
    /// True when the increase is within the threshold
    pub ok: bool,

    /// Percentage increase over the baseline (negative = improvement)
    ///
    /// `None` when the baseline is zero and the actual value is not.
    pub pct_increase: Option<f64>,
}

/// Compare planner cost against a baseline
///
/// # Example
/// ```
/// use querydrift::regression::compare_cost;
///
/// let within = compare_cost(110.0, 100.0, 10.0);
/// assert!(within.ok);
///
/// let over = compare_cost(125.0, 100.0, 10.0);
/// assert!(!over.ok);
/// assert_eq!(over.pct_increase, Some(25.0));
/// ```
pub fn compare_cost(actual: f64, baseline: f64, threshold_pct: f64) -> CostComparison {
    if baseline == 0.0 {
        return if actual == 0.0 {
            CostComparison {
                ok: true,
                pct_increase: Some(0.0),
            }
        } else {
            CostComparison {
                ok: false,
                pct_increase: None,
            }
        };
    }

    let pct_increase = (actual - baseline) / baseline * 100.0;

    // The limit form keeps `baseline * (1 + t/100)` itself inside the threshold
    // even when the percentage rounds just above it
    let limit = baseline * (1.0 + threshold_pct / 100.0);
    let ok = pct_increase <= threshold_pct || actual <= limit;

    CostComparison {
        ok,
        pct_increase: Some(pct_increase),
    }
}

/// Compare shared-buffer counts against a baseline
///
/// Same formula as [`compare_cost`], on 8KB page counts.
pub fn compare_buffers(actual: u64, baseline: u64, threshold_pct: f64) -> CostComparison {
    compare_cost(actual as f64, baseline as f64, threshold_pct)
}
