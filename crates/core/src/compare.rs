//! Per-tag diffing of base and current metric maps.

use std::collections::BTreeMap;
use std::fmt;

use crate::document::{MetricKind, MetricSeries, NamedResultSet};
use crate::{CompareError, Result};

/// Row identity aligning a base value with a current value:
/// one scenario plus one metric kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComparisonTag {
  pub scenario: String,
  pub kind: MetricKind,
}

impl ComparisonTag {
  pub fn new(scenario: impl Into<String>, kind: MetricKind) -> Self {
    Self {
      scenario: scenario.into(),
      kind,
    }
  }
}

impl fmt::Display for ComparisonTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} + {}", self.scenario, self.kind)
  }
}

/// One diff row: the two means plus whatever extra summary fields the
/// current side's series carried.
#[derive(Debug, Clone)]
pub struct ComparisonEntry {
  pub base_mean: f64,
  pub current_mean: f64,
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ComparisonEntry {
  /// Relative change of current over base, as a percentage.
  pub fn change_percent(&self) -> f64 {
    if self.base_mean == 0.0 {
      return if self.current_mean == 0.0 { 0.0 } else { f64::INFINITY };
    }
    (self.current_mean / self.base_mean - 1.0) * 100.0
  }
}

/// Flattened view of one resolved result set: tag -> metric series.
pub type MetricMap = BTreeMap<ComparisonTag, MetricSeries>;

/// The diff: tag -> entry, for tags present in both inputs.
pub type Diff = BTreeMap<ComparisonTag, ComparisonEntry>;

/// Flatten a named result set into a tag-keyed metric map for the tracked
/// kinds. Tags are synthesized here; the kind is decided once and carried.
///
/// A tracked series that cannot produce a finite mean is rejected before
/// comparison begins.
pub fn flatten(set: &NamedResultSet, kinds: &[MetricKind]) -> Result<MetricMap> {
  let mut map = MetricMap::new();
  for (name, document) in set {
    for &kind in kinds {
      let Some(series) = document.get(kind) else {
        continue;
      };
      let tag = ComparisonTag::new(name.clone(), kind);
      if series.mean().is_none() {
        return Err(CompareError::MalformedResultDocument(format!(
          "{} has no finite mean",
          tag
        )));
      }
      map.insert(tag, series.clone());
    }
  }
  Ok(map)
}

/// Compute the per-tag diff of two metric maps.
///
/// Pure: the output depends only on the inputs, keyed by tag rather than
/// position. Tags present on only one side are dropped.
pub fn compare(base: &MetricMap, current: &MetricMap) -> Diff {
  base
    .iter()
    .filter_map(|(tag, base_series)| {
      let current_series = current.get(tag)?;
      // flatten() already rejected series without a finite mean
      let entry = ComparisonEntry {
        base_mean: base_series.mean()?,
        current_mean: current_series.mean()?,
        extra: current_series.extra().cloned().unwrap_or_default(),
      };
      Some((tag.clone(), entry))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::document::ResultDocument;

  fn named_set(entries: &[(&str, &str)]) -> NamedResultSet {
    entries
      .iter()
      .map(|(name, json)| (name.to_string(), serde_json::from_str::<ResultDocument>(json).unwrap()))
      .collect()
  }

  #[test]
  fn test_tag_display() {
    let tag = ComparisonTag::new("threejs_production", MetricKind::Memory);
    assert_eq!(tag.to_string(), "threejs_production + memory");
  }

  #[test]
  fn test_flatten_synthesizes_tags() {
    let set = named_set(&[("app", r#"{"exec": {"mean": 100.0}, "memory": 2048.0}"#)]);
    let map = flatten(&set, &[MetricKind::Exec, MetricKind::Memory]).unwrap();

    assert_eq!(map.len(), 2);
    assert!(map.contains_key(&ComparisonTag::new("app", MetricKind::Exec)));
    assert!(map.contains_key(&ComparisonTag::new("app", MetricKind::Memory)));
  }

  #[test]
  fn test_flatten_skips_untracked_kinds() {
    let set = named_set(&[("app", r#"{"exec": {"mean": 100.0}, "memory": 2048.0}"#)]);
    let map = flatten(&set, &[MetricKind::Exec]).unwrap();
    assert_eq!(map.len(), 1);
  }

  #[test]
  fn test_flatten_rejects_malformed_series() {
    let set = named_set(&[("app", r#"{"exec": []}"#)]);
    let err = flatten(&set, &[MetricKind::Exec]).unwrap_err();
    assert!(matches!(err, CompareError::MalformedResultDocument(_)));
  }

  #[test]
  fn test_compare_intersects_tags() {
    let base = flatten(
      &named_set(&[
        ("shared", r#"{"exec": {"mean": 100.0}}"#),
        ("base-only", r#"{"exec": {"mean": 50.0}}"#),
      ]),
      &[MetricKind::Exec],
    )
    .unwrap();
    let current = flatten(
      &named_set(&[
        ("shared", r#"{"exec": {"mean": 160.0}}"#),
        ("current-only", r#"{"exec": {"mean": 75.0}}"#),
      ]),
      &[MetricKind::Exec],
    )
    .unwrap();

    let diff = compare(&base, &current);

    assert_eq!(diff.len(), 1);
    let entry = &diff[&ComparisonTag::new("shared", MetricKind::Exec)];
    assert_eq!(entry.base_mean, 100.0);
    assert_eq!(entry.current_mean, 160.0);
  }

  #[test]
  fn test_compare_is_deterministic() {
    let base = flatten(
      &named_set(&[
        ("a", r#"{"exec": {"mean": 1.0}, "size": 10.0}"#),
        ("b", r#"{"exec": {"mean": 2.0}}"#),
      ]),
      MetricKind::all(),
    )
    .unwrap();
    let current = flatten(
      &named_set(&[
        ("b", r#"{"exec": {"mean": 3.0}}"#),
        ("a", r#"{"exec": {"mean": 4.0}, "size": 12.0}"#),
      ]),
      MetricKind::all(),
    )
    .unwrap();

    let first = compare(&base, &current);
    let second = compare(&base, &current);

    let rows = |d: &Diff| {
      d.iter()
        .map(|(t, e)| (t.to_string(), e.base_mean, e.current_mean))
        .collect::<Vec<_>>()
    };
    assert_eq!(rows(&first), rows(&second));
    assert_eq!(first.len(), 3);
  }

  #[test]
  fn test_compare_carries_current_extra_fields() {
    let base = flatten(&named_set(&[("app", r#"{"exec": {"mean": 100.0}}"#)]), &[MetricKind::Exec]).unwrap();
    let current = flatten(
      &named_set(&[("app", r#"{"exec": {"mean": 160.0, "variance": 2.5}}"#)]),
      &[MetricKind::Exec],
    )
    .unwrap();

    let diff = compare(&base, &current);
    let entry = &diff[&ComparisonTag::new("app", MetricKind::Exec)];
    assert_eq!(entry.extra.get("variance").and_then(|v| v.as_f64()), Some(2.5));
  }

  #[test]
  fn test_change_percent() {
    let entry = ComparisonEntry {
      base_mean: 100.0,
      current_mean: 160.0,
      extra: Default::default(),
    };
    assert!((entry.change_percent() - 60.0).abs() < 1e-9);
  }
}
