//! Benchmark result retrieval and regression comparison.
//!
//! Resolves a pair of date selectors (base and current) into named sets of
//! captured benchmark result documents, diffs them per scenario/metric tag,
//! and flags the entries that cross the regression threshold.
//!
//! ## Key Concepts
//!
//! - **Selectors**: `current` (local artifacts), `latest` (newest remote
//!   entry) or an explicit calendar date
//! - **Tags**: `"<scenario> + <metric>"` row identities aligning base and
//!   current values
//! - **Diff**: per-tag base/current means, computed only for tags present
//!   on both sides
//! - **Regressions**: diff entries whose current/base ratio crosses the
//!   threshold, after the time-metric noise floor

pub mod compare;
pub mod document;
pub mod regression;
pub mod report;
pub mod source;

pub use compare::{ComparisonEntry, ComparisonTag, Diff, MetricMap, compare, flatten};
pub use document::{DateSelector, MetricKind, MetricSeries, NamedResultSet, ResultDocument};
pub use regression::{RegressionDetector, Thresholds};
pub use report::{BuildInfo, BuildInfoMap, DiffReport, DiffRow};
pub use source::{ResultSource, SourceConfig};

use thiserror::Error;

/// Comparison-specific errors
#[derive(Debug, Error)]
pub enum CompareError {
  #[error("source unavailable: {0}")]
  SourceUnavailable(String),
  #[error("index fetch failed: {0}")]
  IndexFetchFailed(String),
  #[error("document fetch failed: {0}")]
  DocumentFetchFailed(String),
  #[error("fetch timed out: {0}")]
  FetchTimedOut(String),
  #[error("malformed result document: {0}")]
  MalformedResultDocument(String),
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CompareError>;
