//! CLI entry point for building the applicant feature table.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use credit_features::io::{self, SourcePaths};
use credit_features::outliers::{self, OutlierReport};
use credit_features::transforms::log1p_columns;
use credit_features::{
    BuildSummary, FeatureBuilder, FeatureConfig, OutlierFilter, OutlierFilterConfig,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Applicant credit feature builder",
    long_about = "Builds a one-row-per-applicant feature table from the application, bureau,\n\
                  credit card balance and previous application tables.\n\n\
                  EXAMPLES:\n  \
                  # Default file names inside ./data\n  \
                  credit-features --data-dir data -o features.csv\n\n  \
                  # Drop income outliers and write Parquet\n  \
                  credit-features --data-dir data -o features.parquet --outlier-columns AMT_INCOME_TOTAL\n\n  \
                  # Only report how many rows the outlier filter would drop\n  \
                  credit-features --data-dir data --outlier-columns AMT_INCOME_TOTAL --check-outliers"
)]
struct Args {
    /// Directory holding application_train.csv, bureau.csv,
    /// credit_card_balance.csv and previous_application.csv
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// Application table (overrides --data-dir)
    #[arg(long)]
    application: Option<PathBuf>,

    /// Bureau table (overrides --data-dir)
    #[arg(long)]
    bureau: Option<PathBuf>,

    /// Credit card balance table (overrides --data-dir)
    #[arg(long)]
    card_balance: Option<PathBuf>,

    /// Previous application table (overrides --data-dir)
    #[arg(long)]
    previous_application: Option<PathBuf>,

    /// Output file (.csv or .parquet)
    #[arg(short, long, default_value = "./outputs/features.csv")]
    output: PathBuf,

    /// JSON file with a feature configuration
    ///
    /// Missing fields take their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Columns to filter IQR outliers on, comma separated
    #[arg(long, value_delimiter = ',')]
    outlier_columns: Vec<String>,

    /// Width of the inlier band in IQRs beyond each quartile
    #[arg(long, default_value_t = OutlierFilterConfig::DEFAULT_MULTIPLIER)]
    iqr_multiplier: f64,

    /// Report outliers in --outlier-columns without removing them
    #[arg(long)]
    check_outliers: bool,

    /// Columns to replace with ln(1 + x), comma separated
    #[arg(long, value_delimiter = ',')]
    log1p: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    #[arg(long)]
    json: bool,
}

impl Args {
    fn source_paths(&self) -> SourcePaths {
        let defaults = SourcePaths::in_dir(&self.data_dir);
        SourcePaths {
            application: self.application.clone().unwrap_or(defaults.application),
            bureau: self.bureau.clone().unwrap_or(defaults.bureau),
            card_balance: self.card_balance.clone().unwrap_or(defaults.card_balance),
            previous_application: self
                .previous_application
                .clone()
                .unwrap_or(defaults.previous_application),
        }
    }
}

/// Everything `--json` prints.
#[derive(Debug, Serialize)]
struct RunReport {
    output: Option<PathBuf>,
    summary: BuildSummary,
    outlier_reports: Vec<OutlierReport>,
    rows_after_outlier_filter: Option<usize>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries
/// the JSON report.
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
        .init();
}

fn load_config(path: Option<&Path>) -> Result<FeatureConfig> {
    let Some(path) = path else {
        return Ok(FeatureConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: FeatureConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    config.validate()?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let paths = args.source_paths();
    for path in [
        &paths.application,
        &paths.bureau,
        &paths.card_balance,
        &paths.previous_application,
    ] {
        if !path.exists() {
            return Err(anyhow!("Input file not found: {}", path.display()));
        }
    }

    let config = load_config(args.config.as_deref())?;
    let tables = paths.load()?;

    let (mut features, summary) = FeatureBuilder::new(config).build_with_summary(&tables)?;

    if !args.log1p.is_empty() {
        features = log1p_columns(&features, &args.log1p)?;
    }

    let mut report = RunReport {
        output: None,
        summary,
        outlier_reports: Vec::new(),
        rows_after_outlier_filter: None,
    };

    if !args.outlier_columns.is_empty() {
        let filter_config = OutlierFilterConfig::builder()
            .columns(args.outlier_columns.iter().cloned())
            .iqr_multiplier(args.iqr_multiplier)
            .build()?;

        report.outlier_reports = outliers::check_all(&features, &filter_config)?;

        if !args.check_outliers {
            let mut filter = OutlierFilter::new(filter_config);
            features = filter.fit_transform(&features)?;
            report.rows_after_outlier_filter = Some(features.height());
        }
    }

    if !args.check_outliers {
        io::write_table(&mut features, &args.output)?;
        report.output = Some(args.output.clone());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

/// Human-readable run summary.
///
/// Uses `println!` so the summary shows regardless of log level.
fn print_summary(report: &RunReport) {
    let summary = &report.summary;

    println!("\n{}", "=".repeat(60));
    println!("FEATURE BUILD SUMMARY");
    println!("{}", "=".repeat(60));
    println!("  Applicants in:  {}", summary.applicants_in);
    println!("  Rows out:       {}", summary.rows_out);
    println!("  Columns out:    {}", summary.columns_out);
    println!("  Foreign rows:   {}", summary.foreign_rows());
    println!("  Duration:       {}ms", summary.duration_ms);

    println!("\n{:<34} {:>10} {:>10}", "Step", "Rows", "Added");
    println!("{}", "-".repeat(56));
    for record in &summary.steps {
        println!(
            "{:<34} {:>10} {:>10}",
            record.step.display_name(),
            record.rows_after,
            record.rows_introduced
        );
    }

    if !summary.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &summary.warnings {
            println!("  - {}", warning);
        }
    }

    if !report.outlier_reports.is_empty() {
        println!("\nOutliers:");
        for outlier_report in &report.outlier_reports {
            println!("{}", outlier_report);
        }
    }
    if let Some(rows) = report.rows_after_outlier_filter {
        println!("  Rows after outlier filter: {}", rows);
    }

    if let Some(ref output) = report.output {
        println!("\nOutput: {}", output.display());
    }
    println!("{}", "=".repeat(60));
}
