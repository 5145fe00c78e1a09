//! Resolution of date selectors into named result sets.
//!
//! `current` reads the local artifact directory; `latest` and explicit
//! dates go through the remote date-partitioned index. All remote fetches
//! for one resolution run concurrently and the first failure aborts the
//! rest — a resolution is all-or-nothing.

use std::path::PathBuf;
use std::time::Duration;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::document::{DateSelector, NamedResultSet, ResultDocument};
use crate::report::BuildInfoMap;
use crate::{CompareError, Result};

/// Explicit configuration for a result source. No ambient globals: the
/// artifact directory and fetch prefix are injected at construction.
#[derive(Debug, Clone)]
pub struct SourceConfig {
  /// Local artifact directory holding `<scenario>.json` files.
  pub output_dir: PathBuf,
  /// Base URL of the remote data branch, without trailing slash.
  pub fetch_prefix: String,
  /// Per-request timeout for remote fetches.
  pub fetch_timeout: Duration,
}

impl SourceConfig {
  pub fn new(output_dir: PathBuf, fetch_prefix: String) -> Self {
    Self {
      output_dir,
      fetch_prefix: fetch_prefix.trim_end_matches('/').to_string(),
      fetch_timeout: Duration::from_secs(30),
    }
  }
}

/// Resolves date selectors into named result sets.
pub struct ResultSource {
  config: SourceConfig,
  client: reqwest::Client,
}

impl ResultSource {
  /// Create a resolver with a bounded per-request timeout.
  pub fn new(config: SourceConfig) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(config.fetch_timeout).build()?;
    Ok(Self { config, client })
  }

  /// Resolve a selector into the set of named result documents it denotes.
  pub async fn resolve(&self, selector: &DateSelector) -> Result<NamedResultSet> {
    match selector {
      DateSelector::Current => self.resolve_local().await,
      DateSelector::Latest => {
        let paths = self.fetch_index().await?;
        let date = latest_date(&paths)
          .ok_or_else(|| CompareError::IndexFetchFailed(format!("{} has no dated entries", self.index_url())))?
          .to_string();
        info!("latest index entry resolved to {}", date);
        self.resolve_date(&date, &paths).await
      }
      DateSelector::Date(date) => {
        let paths = self.fetch_index().await?;
        self.resolve_date(date, &paths).await
      }
    }
  }

  /// Load every `*.json` artifact from the local output directory.
  async fn resolve_local(&self) -> Result<NamedResultSet> {
    let dir = &self.config.output_dir;
    let mut entries = tokio::fs::read_dir(dir)
      .await
      .map_err(|e| CompareError::SourceUnavailable(format!("cannot list {}: {}", dir.display(), e)))?;

    let mut set = NamedResultSet::new();
    while let Some(entry) = entries
      .next_entry()
      .await
      .map_err(|e| CompareError::SourceUnavailable(format!("cannot list {}: {}", dir.display(), e)))?
    {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
        continue;
      };
      let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| CompareError::DocumentFetchFailed(format!("{}: {}", path.display(), e)))?;
      let document: ResultDocument = serde_json::from_str(&content)
        .map_err(|e| CompareError::DocumentFetchFailed(format!("{}: {}", path.display(), e)))?;
      set.push((name.to_string(), document));
    }

    // Directory listing order is platform-dependent; keep the set ordered.
    set.sort_by(|a, b| a.0.cmp(&b.0));
    info!("resolved {} local artifacts from {}", set.len(), dir.display());
    Ok(set)
  }

  /// Fetch all documents for one date, concurrently. Any single failure
  /// aborts the resolution and drops the in-flight siblings.
  async fn resolve_date(&self, date: &str, paths: &[String]) -> Result<NamedResultSet> {
    let matching: Vec<&String> = paths.iter().filter(|p| p.starts_with(date)).collect();
    debug!("{} index entries match date {}", matching.len(), date);

    let set = try_join_all(matching.iter().map(|path| self.fetch_document(path))).await?;
    info!("resolved {} documents for {}", set.len(), date);
    Ok(set)
  }

  fn index_url(&self) -> String {
    format!("{}/index.txt", self.config.fetch_prefix)
  }

  /// Fetch the newline-delimited remote index. One snapshot per resolution.
  async fn fetch_index(&self) -> Result<Vec<String>> {
    let url = self.index_url();
    debug!("fetching index: {}", url);

    let response = self
      .client
      .get(&url)
      .send()
      .await
      .map_err(|e| fetch_error(e, &url, CompareError::IndexFetchFailed))?;
    if !response.status().is_success() {
      return Err(CompareError::IndexFetchFailed(format!("{}: HTTP {}", url, response.status())));
    }
    let body = response
      .text()
      .await
      .map_err(|e| fetch_error(e, &url, CompareError::IndexFetchFailed))?;

    Ok(parse_index(&body))
  }

  /// Fetch and parse a single result document from the remote data branch.
  async fn fetch_document(&self, path: &str) -> Result<(String, ResultDocument)> {
    let name = scenario_stem(path)
      .ok_or_else(|| CompareError::DocumentFetchFailed(format!("index entry has no scenario component: {}", path)))?
      .to_string();

    let url = format!("{}/{}", self.config.fetch_prefix, path);
    debug!("fetching document: {}", url);

    let response = self
      .client
      .get(&url)
      .send()
      .await
      .map_err(|e| fetch_error(e, &url, CompareError::DocumentFetchFailed))?;
    if !response.status().is_success() {
      return Err(CompareError::DocumentFetchFailed(format!(
        "{}: HTTP {}",
        url,
        response.status()
      )));
    }
    let document: ResultDocument = response
      .json()
      .await
      .map_err(|e| fetch_error(e, &url, CompareError::DocumentFetchFailed))?;

    Ok((name, document))
  }

  /// Fetch the build metadata map (date -> commit info) used to annotate
  /// report headers. Consumed read-only.
  pub async fn fetch_build_info(&self) -> Result<BuildInfoMap> {
    let url = format!("{}/build-info.json", self.config.fetch_prefix);
    debug!("fetching build info: {}", url);

    let response = self
      .client
      .get(&url)
      .send()
      .await
      .map_err(|e| fetch_error(e, &url, CompareError::IndexFetchFailed))?;
    if !response.status().is_success() {
      return Err(CompareError::IndexFetchFailed(format!("{}: HTTP {}", url, response.status())));
    }
    let info = response
      .json()
      .await
      .map_err(|e| fetch_error(e, &url, CompareError::IndexFetchFailed))?;
    Ok(info)
  }
}

/// Map a transport error to the contextual kind, keeping timeouts distinct.
fn fetch_error(err: reqwest::Error, url: &str, kind: fn(String) -> CompareError) -> CompareError {
  if err.is_timeout() {
    CompareError::FetchTimedOut(url.to_string())
  } else {
    kind(format!("{}: {}", url, err))
  }
}

/// Split the index body into non-empty relative paths, preserving order.
/// A trailing blank line is tolerated.
pub fn parse_index(body: &str) -> Vec<String> {
  body.lines().filter(|line| !line.is_empty()).map(str::to_string).collect()
}

/// Date component of the last non-empty index entry.
pub fn latest_date(paths: &[String]) -> Option<&str> {
  paths.last()?.split('/').next()
}

/// File stem of the scenario component of an index entry
/// (`2023-08-08/app.json` -> `app`).
pub fn scenario_stem(path: &str) -> Option<&str> {
  let file = path.split('/').nth(1)?;
  Some(file.strip_suffix(".json").unwrap_or(file))
}
