//! Regression classification over a computed diff.

use tracing::debug;

use crate::compare::{ComparisonEntry, ComparisonTag, Diff};

/// Significance thresholds for regression classification.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
  /// Absolute floor below which time metrics are too noisy to trust,
  /// in the metric's native unit.
  pub noise_floor: f64,
  /// Minimum current/base ratio that counts as a regression.
  pub ratio: f64,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      noise_floor: 300.0,
      ratio: 1.05,
    }
  }
}

/// Pure filter over a diff: keeps the tags whose entries cross the
/// significance threshold.
#[derive(Debug, Clone, Default)]
pub struct RegressionDetector {
  thresholds: Thresholds,
}

impl RegressionDetector {
  pub fn new(thresholds: Thresholds) -> Self {
    Self { thresholds }
  }

  /// Classify a diff, returning flagged tags in diff iteration order.
  pub fn classify(&self, diff: &Diff) -> Vec<ComparisonTag> {
    diff
      .iter()
      .filter(|(tag, entry)| self.is_regression(tag, entry))
      .map(|(tag, _)| tag.clone())
      .collect()
  }

  fn is_regression(&self, tag: &ComparisonTag, entry: &ComparisonEntry) -> bool {
    // Sub-floor absolute time values are exempt regardless of ratio.
    // Memory and size metrics bypass the floor.
    if tag.kind.is_time() && entry.current_mean < self.thresholds.noise_floor {
      return false;
    }

    // Degenerate baseline: the ratio is undefined, so surface the entry
    // whenever the current side measured anything at all.
    if !(entry.base_mean > 0.0) || !entry.base_mean.is_finite() {
      debug!("degenerate baseline for {}: base={}", tag, entry.base_mean);
      return entry.current_mean > 0.0;
    }

    entry.current_mean / entry.base_mean >= self.thresholds.ratio
  }
}
