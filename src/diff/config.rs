// Configuration for result set comparison

use serde::{Deserialize, Serialize};

/// Configuration for result set comparison
///
/// # Example
/// ```
/// use querydrift::diff::DiffConfig;
///
/// let config = DiffConfig::default();
/// assert_eq!(config.float_tolerance, 0.0); // exact
/// assert_eq!(config.max_samples, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Absolute tolerance for numeric cells
    ///
    /// - 0.0 (default): exact comparison
    /// - 0.001: values within one thousandth compare equal
    ///
    /// Never applied to timestamps.
    pub float_tolerance: f64,

    /// Maximum number of sample rows (or row pairs) kept per side
    ///
    /// Default: 5
    pub max_samples: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            float_tolerance: 0.0,
            max_samples: 5,
        }
    }
}

impl DiffConfig {
    /// Create a configuration with the given numeric tolerance
    pub fn with_tolerance(float_tolerance: f64) -> Self {
        Self {
            float_tolerance,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.float_tolerance.is_nan() || self.float_tolerance < 0.0 {
            return Err(format!(
                "float_tolerance must be non-negative, got {}",
                self.float_tolerance
            ));
        }

        if self.max_samples == 0 {
            return Err("max_samples must be > 0, got 0".to_string());
        }

        Ok(())
    }
}
