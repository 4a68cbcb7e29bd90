//! Analysis configuration (querydrift.toml)
//!
//! Every threshold the analyzers use is passed explicitly; this module only
//! loads and validates those values and resolves per-query overrides.
//!
//! # Example querydrift.toml
//!
//! ```toml
//! cost_threshold_pct = 20.0
//! ignored_tables = ["audit_log"]
//!
//! [diff]
//! float_tolerance = 0.001
//! max_samples = 5
//!
//! [queries.report_totals]
//! disable_seqscan_warning = true
//! float_tolerance = 0.01
//! cost_threshold_pct = 50.0
//! ```

use crate::diff::DiffConfig;
use crate::regression::VerdictThresholds;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while parsing or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Per-query options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Suppress sequential scan warnings for this query
    pub disable_seqscan_warning: bool,

    /// Numeric tolerance override for this query's result comparison
    pub float_tolerance: Option<f64>,

    /// Cost threshold override for this query's verdict
    pub cost_threshold_pct: Option<f64>,
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Allowed cost/buffer increase over baseline, in percent
    pub cost_threshold_pct: f64,

    /// Tables never reported in sequential scan warnings
    pub ignored_tables: Vec<String>,

    /// Result set comparison defaults
    pub diff: DiffConfig,

    /// Query name → options
    pub queries: BTreeMap<String, QueryOptions>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cost_threshold_pct: VerdictThresholds::default().cost_threshold_pct,
            ignored_tables: Vec::new(),
            diff: DiffConfig::default(),
            queries: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use querydrift::config::AnalysisConfig;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = AnalysisConfig::from_file("querydrift.toml")?;
    /// println!("Ignoring {} tables", config.ignored_tables.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_threshold("cost_threshold_pct", self.cost_threshold_pct)?;
        self.diff.validate().map_err(ConfigError::Invalid)?;

        for (name, options) in &self.queries {
            if let Some(tolerance) = options.float_tolerance {
                DiffConfig::with_tolerance(tolerance)
                    .validate()
                    .map_err(|e| ConfigError::Invalid(format!("queries.{name}: {e}")))?;
            }
            if let Some(pct) = options.cost_threshold_pct {
                check_threshold(&format!("queries.{name}.cost_threshold_pct"), pct)?;
            }
        }

        Ok(())
    }

    /// Options for a query (defaults when not configured)
    pub fn query_options(&self, query: &str) -> QueryOptions {
        self.queries.get(query).cloned().unwrap_or_default()
    }

    /// Diff settings for a query, applying its tolerance override
    pub fn diff_config_for(&self, query: &str) -> DiffConfig {
        let mut config = self.diff.clone();
        if let Some(tolerance) = self.queries.get(query).and_then(|q| q.float_tolerance) {
            config.float_tolerance = tolerance;
        }
        config
    }

    /// Verdict thresholds for a query, applying its threshold override
    pub fn thresholds_for(&self, query: &str) -> VerdictThresholds {
        let cost_threshold_pct = self
            .queries
            .get(query)
            .and_then(|q| q.cost_threshold_pct)
            .unwrap_or(self.cost_threshold_pct);
        VerdictThresholds { cost_threshold_pct }
    }
}

fn check_threshold(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be a non-negative number, got {value}"
        )))
    }
}
