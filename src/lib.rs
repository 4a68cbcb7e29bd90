//! querydrift - Result set diffing and EXPLAIN plan regression analysis
//!
//! This library is the analytical core of a SQL regression-testing tool.
//! After a query library is re-run against a database, it decides whether
//! results changed in a way that matters and whether a query's execution
//! plan got worse, and explains why:
//!
//! - [`diff`]: tolerant result set comparison with ordering detection
//! - [`plan`]: EXPLAIN JSON decoding and plan signature extraction
//! - [`regression`]: plan regression classification, remediation and verdicts
//! - [`analysis`]: baseline-free plan quality warnings
//! - [`config`]: TOML-loadable thresholds passed explicitly to every analyzer
//!
//! All analysis is pure and synchronous; nothing here touches a database.

pub mod analysis;
pub mod config;
pub mod diff;
pub mod plan;
pub mod regression;
pub mod severity;

pub use severity::Severity;
