//! Compare two captured benchmark runs and flag regressions.
//!
//! Resolves the base and current selectors concurrently (together with the
//! build metadata used to annotate the report header), diffs the runs per
//! scenario/metric tag and exits non-zero when the threshold is exceeded.

use std::path::PathBuf;

use benchdiff_core::{
  DateSelector, DiffReport, MetricKind, RegressionDetector, ResultSource, SourceConfig, compare, flatten,
};
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_DATA_URL: &str = "https://raw.githubusercontent.com/benchdiff/benchdiff-data/main";

#[derive(Parser)]
#[command(name = "benchdiff")]
#[command(about = "Compare captured benchmark runs and flag regressions")]
#[command(version)]
struct Cli {
  /// Base run selector: a date, "current" or "latest" (default: yesterday)
  base: Option<String>,

  /// Current run selector (default: today)
  current: Option<String>,

  /// Metric kinds to compare (comma-separated: exec,memory,size)
  #[arg(long, value_delimiter = ',', default_value = "exec")]
  metrics: Vec<String>,

  /// Local artifact directory used by the "current" selector
  #[arg(long, default_value = "output")]
  output_dir: PathBuf,

  /// Base URL of the captured-data branch
  #[arg(long, default_value = DEFAULT_DATA_URL)]
  data_url: String,

  /// Save the comparison report as JSON
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  // Setup logging
  let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
  let subscriber = FmtSubscriber::builder()
    .with_max_level(level)
    .with_target(false)
    .finish();
  tracing::subscriber::set_global_default(subscriber)?;

  let today = chrono::Local::now().date_naive();
  let yesterday = today.pred_opt().unwrap_or(today);
  let base = cli.base.unwrap_or_else(|| yesterday.format("%Y-%m-%d").to_string());
  let current = cli.current.unwrap_or_else(|| today.format("%Y-%m-%d").to_string());

  let kinds: Vec<MetricKind> = cli
    .metrics
    .iter()
    .map(|name| MetricKind::from_name(name).ok_or_else(|| anyhow::anyhow!("unknown metric kind: {}", name)))
    .collect::<anyhow::Result<_>>()?;

  info!("comparing {} vs {} ({:?})", base, current, kinds);

  let source = ResultSource::new(SourceConfig::new(cli.output_dir, cli.data_url))?;
  let base_selector = DateSelector::parse(&base);
  let current_selector = DateSelector::parse(&current);

  // Both resolutions and the build metadata fetch fan out together.
  let (base_set, current_set, build_info) = tokio::try_join!(
    source.resolve(&base_selector),
    source.resolve(&current_selector),
    source.fetch_build_info(),
  )?;

  let base_map = flatten(&base_set, &kinds)?;
  let current_map = flatten(&current_set, &kinds)?;
  let diff = compare(&base_map, &current_map);

  let detector = RegressionDetector::default();
  let flagged = detector.classify(&diff);

  let report = DiffReport::assemble(&base, &current, &diff, &flagged, &build_info);
  println!("{}", report.to_markdown());

  if let Some(path) = &cli.output {
    report.save(path).await?;
  }

  if !flagged.is_empty() {
    println!();
    println!("Threshold exceeded: {}", serde_json::to_string(&report.flagged_tags())?);
    std::process::exit(1);
  }

  Ok(())
}
