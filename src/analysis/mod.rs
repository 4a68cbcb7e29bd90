//! Baseline-independent plan quality analysis

pub mod plan_quality;

pub use plan_quality::{
    analyze_plan, PlanCostInfo, PlanQualityAnalyzer, PlanWarning, QualityThresholds, WarningKind,
};
