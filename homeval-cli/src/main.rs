//! CLI entry point for the house-price analysis.

use anyhow::{bail, Context, Result};
use clap::Parser;
use homeval::data::{Frame, TargetTransform};
use homeval::{run, AnalysisConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Compare, tune and stack regression models for house prices",
    long_about = "Runs the full analysis on a CSV table: candidate comparison by \
                  5-fold cross-validation, randomized random-forest search, \
                  stacking ensemble, and a report of metrics and importances.\n\n\
                  EXAMPLES:\n  \
                  homeval -i house_prices.csv\n  \
                  homeval --synthetic 1000 --n-iter 10 --json\n  \
                  homeval -i train.csv --predictions-out preds.csv --importances-out imp.csv"
)]
struct Args {
    /// CSV file with a header row
    #[arg(short, long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    input: Option<PathBuf>,

    /// Run on a generated table with this many rows instead of a file
    #[arg(long, value_name = "ROWS")]
    synthetic: Option<usize>,

    /// Seed for the generated table
    #[arg(long, default_value = "42")]
    synthetic_seed: u64,

    /// JSON file overriding any part of the default configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target column (overrides the config)
    #[arg(short, long)]
    target: Option<String>,

    /// Number of randomized-search draws (overrides the config)
    #[arg(long)]
    n_iter: Option<usize>,

    /// Worker threads (defaults to all cores)
    #[arg(short = 'j', long)]
    n_jobs: Option<usize>,

    /// Drop rows whose target lies outside the 1st-99th percentile band
    #[arg(long)]
    clip_outliers: bool,

    /// Fit on the raw target instead of log1p(target)
    #[arg(long)]
    no_log_target: bool,

    /// Write the tuned model's actual/predicted test pairs to this CSV
    #[arg(long)]
    predictions_out: Option<PathBuf>,

    /// Write the full ranked importance list to this CSV
    #[arg(long)]
    importances_out: Option<PathBuf>,

    /// Also write the JSON report to this file
    #[arg(long)]
    report_out: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Print the report as JSON on stdout; disables logging
    #[arg(long)]
    json: bool,
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--log-level`.
///
/// With `--json` nothing is installed so stdout carries only the report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(target) = &args.target {
        config.preparation.target = target.clone();
    }
    if let Some(n_iter) = args.n_iter {
        config.n_iter = n_iter;
    }
    if args.n_jobs.is_some() {
        config.n_jobs = args.n_jobs;
    }
    if args.clip_outliers {
        config.preparation.clip_target_outliers = true;
    }
    if args.no_log_target {
        config.preparation.target_transform = TargetTransform::Identity;
    }
    config.validate()?;
    Ok(config)
}

fn load_table(args: &Args) -> Result<Frame> {
    match (&args.input, args.synthetic) {
        (Some(path), _) => homeval::io::read_csv(path)
            .with_context(|| format!("failed to read {}", path.display())),
        (None, Some(rows)) => {
            info!(rows, seed = args.synthetic_seed, "generating synthetic housing table");
            Ok(homeval::datasets::make_housing(rows, args.synthetic_seed)?)
        }
        (None, None) => bail!("either --input or --synthetic is required"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config = load_config(&args)?;
    let frame = load_table(&args)?;
    info!(rows = frame.n_rows(), columns = frame.n_cols(), "table loaded");

    let outcome = run(&frame, &config)?;

    if let Some(path) = &args.predictions_out {
        homeval::io::write_csv_rows(path, &outcome.predictions)?;
        info!(path = %path.display(), "predictions written");
    }
    if let Some(path) = &args.importances_out {
        homeval::io::write_csv_rows(path, &outcome.importances)?;
        info!(path = %path.display(), "importances written");
    }
    if let Some(path) = &args.report_out {
        homeval::io::write_json(path, &outcome.report)?;
        info!(path = %path.display(), "report written");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        println!("{}", outcome.report);
    }
    Ok(())
}
