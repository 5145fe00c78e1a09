//! Result document data model: selectors, metric kinds and metric series.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies which captured run to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSelector {
  /// Local artifacts in the configured output directory.
  Current,
  /// Most recent entry in the remote index.
  Latest,
  /// An explicit calendar date, e.g. `2023-08-08`.
  Date(String),
}

impl DateSelector {
  /// Parse a CLI selector string. Anything that is not a keyword is treated
  /// as an explicit date.
  pub fn parse(s: &str) -> Self {
    match s {
      "current" => Self::Current,
      "latest" => Self::Latest,
      other => Self::Date(other.to_string()),
    }
  }
}

impl fmt::Display for DateSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Current => write!(f, "current"),
      Self::Latest => write!(f, "latest"),
      Self::Date(d) => write!(f, "{}", d),
    }
  }
}

/// Category of measurement within a result document.
///
/// Decided once when tags are synthesized; downstream code branches on the
/// enum, never on tag-string suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
  /// Execution time, subject to the absolute noise floor.
  Exec,
  /// Peak memory.
  Memory,
  /// Output size.
  Size,
}

impl MetricKind {
  /// All known metric kinds.
  pub fn all() -> &'static [MetricKind] {
    &[Self::Exec, Self::Memory, Self::Size]
  }

  /// Key under which this kind appears in a result document.
  pub fn wire_name(self) -> &'static str {
    match self {
      Self::Exec => "exec",
      Self::Memory => "memory",
      Self::Size => "size",
    }
  }

  /// Parse a wire name back into a kind.
  pub fn from_name(name: &str) -> Option<Self> {
    Self::all().iter().copied().find(|k| k.wire_name() == name)
  }

  /// Whether this is a latency/time measurement. Only time metrics are
  /// exempted below the absolute noise floor.
  pub fn is_time(self) -> bool {
    matches!(self, Self::Exec)
  }
}

impl fmt::Display for MetricKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.wire_name())
  }
}

/// One metric value inside a result document.
///
/// Documents are produced externally; on the wire a metric is either a bare
/// number, a vector of raw samples, or a summary object carrying at least a
/// `mean` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricSeries {
  Scalar(f64),
  Samples(Vec<f64>),
  Summary(MetricSummary),
}

/// Pre-aggregated summary form of a metric series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
  /// Arithmetic mean of the underlying samples.
  pub mean: f64,
  /// Any other summary fields the producer recorded (variance, p95, ...).
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MetricSeries {
  /// Arithmetic mean of the series, or `None` when the series cannot
  /// produce a finite mean (empty samples, NaN/infinite values).
  pub fn mean(&self) -> Option<f64> {
    let mean = match self {
      Self::Scalar(v) => *v,
      Self::Samples(samples) => {
        if samples.is_empty() {
          return None;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
      }
      Self::Summary(summary) => summary.mean,
    };
    mean.is_finite().then_some(mean)
  }

  /// Extra summary fields carried alongside the mean, if any.
  pub fn extra(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
    match self {
      Self::Summary(summary) => Some(&summary.extra),
      _ => None,
    }
  }
}

/// An externally produced result document: metric-kind wire name to series.
/// Treated as an opaque keyed bag, read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultDocument(pub BTreeMap<String, MetricSeries>);

impl ResultDocument {
  /// Look up the series for a metric kind.
  pub fn get(&self, kind: MetricKind) -> Option<&MetricSeries> {
    self.0.get(kind.wire_name())
  }
}

/// Ordered `(scenario name, result document)` pairs belonging to one
/// selector resolution. Built once per comparison run, never mutated.
pub type NamedResultSet = Vec<(String, ResultDocument)>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selector_parse() {
    assert_eq!(DateSelector::parse("current"), DateSelector::Current);
    assert_eq!(DateSelector::parse("latest"), DateSelector::Latest);
    assert_eq!(
      DateSelector::parse("2023-08-08"),
      DateSelector::Date("2023-08-08".to_string())
    );
  }

  #[test]
  fn test_metric_kind_names() {
    assert_eq!(MetricKind::from_name("exec"), Some(MetricKind::Exec));
    assert_eq!(MetricKind::from_name("memory"), Some(MetricKind::Memory));
    assert_eq!(MetricKind::from_name("size"), Some(MetricKind::Size));
    assert_eq!(MetricKind::from_name("cpu"), None);
    assert!(MetricKind::Exec.is_time());
    assert!(!MetricKind::Memory.is_time());
    assert!(!MetricKind::Size.is_time());
  }

  #[test]
  fn test_series_mean_forms() {
    let scalar: MetricSeries = serde_json::from_str("42.5").unwrap();
    assert_eq!(scalar.mean(), Some(42.5));

    let samples: MetricSeries = serde_json::from_str("[100.0, 200.0, 300.0]").unwrap();
    assert_eq!(samples.mean(), Some(200.0));

    let summary: MetricSeries = serde_json::from_str(r#"{"mean": 120.0, "variance": 3.5}"#).unwrap();
    assert_eq!(summary.mean(), Some(120.0));
    assert_eq!(
      summary.extra().and_then(|e| e.get("variance")).and_then(|v| v.as_f64()),
      Some(3.5)
    );
  }

  #[test]
  fn test_series_degenerate_mean() {
    assert_eq!(MetricSeries::Samples(vec![]).mean(), None);
    assert_eq!(MetricSeries::Scalar(f64::NAN).mean(), None);
    assert_eq!(MetricSeries::Scalar(f64::INFINITY).mean(), None);
  }

  #[test]
  fn test_document_lookup() {
    let doc: ResultDocument = serde_json::from_str(r#"{"exec": {"mean": 100.0}, "memory": 2048.0}"#).unwrap();
    assert_eq!(doc.get(MetricKind::Exec).and_then(|s| s.mean()), Some(100.0));
    assert_eq!(doc.get(MetricKind::Memory).and_then(|s| s.mean()), Some(2048.0));
    assert!(doc.get(MetricKind::Size).is_none());
  }
}
