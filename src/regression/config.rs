// Thresholds for the plan verdict

use serde::{Deserialize, Serialize};

/// Thresholds for the plan verdict
///
/// # Example
/// ```
/// use querydrift::regression::VerdictThresholds;
///
/// let thresholds = VerdictThresholds::default();
/// assert_eq!(thresholds.cost_threshold_pct, 20.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictThresholds {
    /// Allowed increase of buffers (or cost) over baseline, in percent
    ///
    /// - 20.0 (default): tolerate planner noise and modest data growth
    /// - 0.0: any increase fails
    ///
    /// A critical plan regression fails the verdict regardless.
    pub cost_threshold_pct: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            cost_threshold_pct: 20.0,
        }
    }
}

impl VerdictThresholds {
    /// Create a strict configuration (any increase fails)
    pub fn strict() -> Self {
        Self {
            cost_threshold_pct: 0.0,
        }
    }

    /// Create a permissive configuration (cost may double)
    pub fn permissive() -> Self {
        Self {
            cost_threshold_pct: 100.0,
        }
    }
}
