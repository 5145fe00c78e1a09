//! Report assembly: diff plus build metadata, in the shape the renderer
//! and CI consumers read.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Result;
use crate::compare::{ComparisonTag, Diff};

/// Build metadata for one captured run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
  /// Commit the run was built from.
  #[serde(rename = "commitSHA")]
  pub commit_sha: String,
  /// Any other annotation fields the producer recorded.
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Date string -> build metadata, fetched from the data branch.
pub type BuildInfoMap = BTreeMap<String, BuildInfo>;

/// One rendered diff row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRow {
  /// Row identity, `"<scenario> + <metric>"`.
  pub tag: String,
  /// Base run mean.
  pub base_mean: f64,
  /// Current run mean.
  pub current_mean: f64,
  /// Relative change as a percentage.
  pub change_percent: f64,
  /// Whether the regression detector flagged this row.
  pub regression: bool,
}

/// Comparison report between two captured runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffReport {
  /// Base run selector as given on the command line.
  pub base: String,
  /// Current run selector as given on the command line.
  pub current: String,
  /// Commit the base run was built from, when build metadata has it.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub base_commit_sha: Option<String>,
  /// Per-tag rows in diff order.
  pub rows: Vec<DiffRow>,
}

impl DiffReport {
  /// Combine a diff, the flagged tags and build metadata into a report.
  pub fn assemble(base: &str, current: &str, diff: &Diff, flagged: &[ComparisonTag], build_info: &BuildInfoMap) -> Self {
    let flagged: HashSet<&ComparisonTag> = flagged.iter().collect();
    let rows = diff
      .iter()
      .map(|(tag, entry)| DiffRow {
        tag: tag.to_string(),
        base_mean: entry.base_mean,
        current_mean: entry.current_mean,
        change_percent: entry.change_percent(),
        regression: flagged.contains(tag),
      })
      .collect();

    Self {
      base: base.to_string(),
      current: current.to_string(),
      base_commit_sha: build_info.get(base).map(|b| b.commit_sha.clone()),
      rows,
    }
  }

  /// Tags of the flagged rows, in row order.
  pub fn flagged_tags(&self) -> Vec<&str> {
    self.rows.iter().filter(|r| r.regression).map(|r| r.tag.as_str()).collect()
  }

  /// Render the human-readable diff table.
  pub fn to_markdown(&self) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Benchmark Diff: {} → {}\n\n", self.base, self.current));
    if let Some(sha) = &self.base_commit_sha {
      out.push_str(&format!("Base commit: `{}`\n\n", sha));
    }

    out.push_str("| Tag | Base | Current | Change | |\n");
    out.push_str("|-----|------|---------|--------|--|\n");
    for row in &self.rows {
      let marker = if row.regression { "⚠" } else { "" };
      out.push_str(&format!(
        "| {} | {:.2} | {:.2} | {:+.2}% | {} |\n",
        row.tag, row.base_mean, row.current_mean, row.change_percent, marker
      ));
    }

    out
  }

  /// Save the report as pretty-printed JSON.
  pub async fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(self)?;
    tokio::fs::write(path, json).await?;
    info!("report saved to: {}", path.display());
    Ok(())
  }
}
