//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Selection;
use clap::Parser;
use std::path::PathBuf;

/// Salesdash - sales analytics dashboard for order data
///
/// Loads orders, order items, stores and products from CSV files and
/// renders total revenue, year-over-year growth, revenue by region and
/// top products as a Markdown or JSON dashboard.
///
/// Examples:
///   salesdash --data-dir ./data
///   salesdash --data-dir ./data --region CA --format json -o dashboard.json
///   salesdash --data-dir ./data --product 8 --top 5
///   salesdash --data-dir ./data --dry-run
///   salesdash --data-dir ./data --watch --interval 10
///   salesdash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding orders.csv, order_items.csv, stores.csv and products.csv
    ///
    /// Default: from config or ./data
    #[arg(short, long, value_name = "DIR", env = "SALESDASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output file path for the dashboard
    ///
    /// Default: from config or sales_dashboard.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Show figures for a single region (state label)
    ///
    /// Omit to include all regions.
    #[arg(long, value_name = "STATE")]
    pub region: Option<String>,

    /// Show figures for a single product (product_id)
    ///
    /// Omit to include all products.
    #[arg(long, value_name = "ID")]
    pub product: Option<String>,

    /// Number of products in the top-products ranking
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Extra chrono format for order dates (e.g. "%d/%m/%Y")
    #[arg(long, value_name = "FORMAT")]
    pub date_format: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .salesdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when rows were dropped on dangling keys
    ///
    /// Useful for CI pipelines validating exported data.
    #[arg(long)]
    pub fail_on_warnings: bool,

    /// Dry run: list the CSV files that would be loaded and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Keep running and re-render whenever the input tables change
    #[arg(long, conflicts_with = "dry_run")]
    pub watch: bool,

    /// Seconds between reloads in watch mode
    #[arg(long, value_name = "SECS", requires = "watch")]
    pub interval: Option<u64>,

    /// Generate a default .salesdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("Top products count must be at least 1".to_string());
        }

        if self.interval == Some(0) {
            return Err("Watch interval must be at least 1 second".to_string());
        }

        if self.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err("Region must not be empty; omit --region for all regions".to_string());
        }

        if self.product.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err("Product must not be empty; omit --product for all products".to_string());
        }

        if let Some(ref dir) = self.data_dir {
            if !dir.exists() {
                return Err(format!("Data directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!("Data path is not a directory: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The region filter.
    pub fn region_selection(&self) -> Selection<String> {
        Selection::from(self.region.as_ref().map(|r| r.trim().to_string()))
    }

    /// The product filter.
    pub fn product_selection(&self) -> Selection<String> {
        Selection::from(self.product.as_ref().map(|p| p.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data_dir: None,
            output: None,
            format: OutputFormat::Markdown,
            region: None,
            product: None,
            top: None,
            date_format: None,
            config: None,
            verbose: false,
            quiet: false,
            fail_on_warnings: false,
            dry_run: false,
            watch: false,
            interval: None,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "salesdash",
            "--region",
            "CA",
            "--product",
            "8",
            "--format",
            "json",
            "--top",
            "5",
        ])
        .unwrap();

        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.top, Some(5));
        assert_eq!(args.region_selection(), Selection::Specific("CA".to_string()));
        assert_eq!(args.product_selection(), Selection::Specific("8".to_string()));
    }

    #[test]
    fn test_interval_requires_watch() {
        assert!(Args::try_parse_from(["salesdash", "--interval", "3"]).is_err());
        assert!(Args::try_parse_from(["salesdash", "--watch", "--interval", "3"]).is_ok());
    }

    #[test]
    fn test_default_selections_are_all() {
        let args = make_args();
        assert_eq!(args.region_selection(), Selection::All);
        assert_eq!(args.product_selection(), Selection::All);
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_top() {
        let mut args = make_args();
        args.top = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_blank_region() {
        let mut args = make_args();
        args.region = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_data_dir() {
        let mut args = make_args();
        args.data_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
