//! Salesdash - Sales Analytics Dashboard
//!
//! A CLI tool that loads order, order item, store and product tables,
//! aggregates revenue, growth, regional revenue and top products, and
//! renders the result as a Markdown or JSON dashboard.
//!
//! Exit codes:
//!   0 - Success (no dropped rows, or no --fail-on-warnings set)
//!   1 - Runtime error (missing table, invalid input, config, I/O, etc.)
//!   2 - Rows dropped on dangling keys with --fail-on-warnings

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;

use analysis::{PipelineCache, PipelineOptions};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use loader::{DataSource, LoadOptions, TableFiles};
use models::{Dashboard, DashboardMetadata};
use report::RenderOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can raise verbosity
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("Salesdash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {}", config_source);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Dashboard failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .salesdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the data directory, file names, and dashboard.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the dashboard workflow. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let source = DataSource::new(
        PathBuf::from(&config.data.directory),
        TableFiles::from(&config.data),
    );

    // Handle --dry-run: list files and exit
    if args.dry_run {
        return handle_dry_run(&source);
    }

    let mut cache = PipelineCache::new(config.dashboard.cache_capacity);

    if args.watch {
        return watch(&args, &config, &source, &mut cache).await;
    }

    println!("📥 Loading sales data from: {}", source.root().display());
    let dashboard = build(&args, &config, &source, &mut cache, !args.quiet)?;

    println!("\n📝 Generating dashboard...");
    let output_path = resolve_output_path(&args, &config);
    write_dashboard(&dashboard, args.format, &output_path, &RenderOptions::from(&config))?;

    print_summary(&dashboard, &config.dashboard.currency_symbol);
    println!(
        "\n✅ Dashboard complete! Saved to: {}",
        output_path.display()
    );

    if args.fail_on_warnings && !dashboard.warnings.is_empty() {
        eprintln!(
            "\n⛔ {} rows dropped on dangling keys. Failing (exit code 2).",
            dashboard.warnings.len()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Load the tables, run the cached pipeline and assemble the dashboard.
fn build(
    args: &Args,
    config: &Config,
    source: &DataSource,
    cache: &mut PipelineCache,
    show_progress: bool,
) -> Result<Dashboard> {
    Ok(refresh(args, config, source, cache, show_progress)?.0)
}

/// Like [`build`], but also reports whether the inputs were unchanged
/// since the last computation.
fn refresh(
    args: &Args,
    config: &Config,
    source: &DataSource,
    cache: &mut PipelineCache,
    show_progress: bool,
) -> Result<(Dashboard, bool)> {
    let start_time = Instant::now();

    let data = source
        .load(&LoadOptions { show_progress })
        .context("Failed to load input tables")?;

    let options = PipelineOptions {
        top_products_limit: config.dashboard.top_products,
        date_format: config.data.date_format.clone(),
    };

    let run = cache
        .get_or_compute(&data, &options)
        .context("Failed to aggregate sales data")?;

    let metadata = DashboardMetadata {
        data_source: source.root().display().to_string(),
        generated_at: Utc::now(),
        row_counts: data.row_counts(),
        fingerprint: run.fingerprint.clone(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let dashboard = report::build_dashboard(
        &run.aggregates,
        metadata,
        &args.region_selection(),
        &args.product_selection(),
        &config.dashboard.currency_symbol,
    );

    Ok((dashboard, run.hit))
}

/// Render the dashboard in the requested format and write it to disk.
fn write_dashboard(
    dashboard: &Dashboard,
    format: OutputFormat,
    path: &Path,
    options: &RenderOptions,
) -> Result<()> {
    let output = match format {
        OutputFormat::Json => report::generate_json_report(dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_report(dashboard, options),
    };

    std::fs::write(path, &output)
        .with_context(|| format!("Failed to write dashboard to {}", path.display()))
}

/// Output path, switching the default extension to `.json` for JSON output.
fn resolve_output_path(args: &Args, config: &Config) -> PathBuf {
    let path = PathBuf::from(&config.general.output);

    if args.output.is_none()
        && args.format == OutputFormat::Json
        && path.extension().and_then(|e| e.to_str()) == Some("md")
    {
        return path.with_extension("json");
    }

    path
}

/// Print the KPI summary to the terminal.
fn print_summary(dashboard: &Dashboard, currency_symbol: &str) {
    let kpis = &dashboard.kpis;
    let view = &dashboard.filter_view;

    println!("\n📊 Sales Summary:");
    println!("   Total revenue: {}", kpis.total_revenue_display);
    for card in &kpis.growth {
        println!(
            "   Growth {}: {}",
            card.year,
            report::format_percent(card.growth_pct)
        );
    }
    println!(
        "   Regions: {} | Products ranked: {}",
        dashboard.region_revenue.len(),
        dashboard.top_products.len()
    );

    if !view.region.is_all() || !view.product.is_all() {
        println!(
            "   Selection (region: {}, product: {}): {} over {} units",
            view.region,
            view.product,
            report::format_currency(view.revenue, currency_symbol),
            view.quantity
        );
    }

    if !dashboard.warnings.is_empty() {
        println!(
            "   ⚠️  {} rows dropped on dangling keys (see report)",
            dashboard.warnings.len()
        );
    }
    println!("   Duration: {:.2}s", dashboard.metadata.duration_seconds);
}

/// Handle --watch: reload on an interval, re-render when inputs change.
async fn watch(
    args: &Args,
    config: &Config,
    source: &DataSource,
    cache: &mut PipelineCache,
) -> Result<i32> {
    let interval = Duration::from_secs(config.general.watch_interval_seconds.max(1));
    let output_path = resolve_output_path(args, config);
    let render_options = RenderOptions::from(config);

    println!(
        "👀 Watching {} every {}s (Ctrl-C to stop)",
        source.root().display(),
        interval.as_secs()
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match refresh(args, config, source, cache, false) {
                    Ok((_, true)) => debug!("Inputs unchanged, skipping render"),
                    Ok((dashboard, false)) => {
                        write_dashboard(&dashboard, args.format, &output_path, &render_options)?;
                        let (hits, misses) = cache.stats();
                        info!(
                            "Dashboard refreshed ({} cached, {} hits, {} misses)",
                            cache.len(),
                            hits,
                            misses
                        );
                        print_summary(&dashboard, &config.dashboard.currency_symbol);
                    }
                    Err(e) => {
                        warn!("Refresh failed, keeping previous dashboard: {:#}", e);
                        // Re-render on the next good load even if it matches the cached input
                        if !cache.is_empty() {
                            cache.invalidate();
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n👋 Stopping watch.");
                return Ok(0);
            }
        }
    }
}

/// Handle --dry-run: list the files that would be loaded and exit.
fn handle_dry_run(source: &DataSource) -> Result<i32> {
    println!(
        "\n🔍 Dry run: scanning {} (no aggregation)...\n",
        source.root().display()
    );

    let files = source.discover();

    if files.is_empty() {
        println!("   No CSV files found.");
    } else {
        for file in &files {
            match file.table {
                Some(table) => println!("     📄 {} → {} ({} bytes)", file.path, table, file.size),
                None => println!("     ·  {} (unused, {} bytes)", file.path, file.size),
            }
        }
    }

    let missing = source.missing_tables();
    if !missing.is_empty() {
        println!();
        for table in &missing {
            println!(
                "   ❌ Missing {} table: {}",
                table,
                source.path_for(*table).display()
            );
        }
    }

    println!("\n✅ Dry run complete. No aggregation was performed.");
    Ok(if missing.is_empty() { 0 } else { 1 })
}

/// Load configuration from file or use defaults.
///
/// Returns the configuration and a description of where it came from.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, format!("loaded from {}", config_path.display())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, format!("loaded from {}", CONFIG_FILE_NAME))),
        Ok(None) => Ok((Config::default(), "defaults (no config file)".to_string())),
        Err(e) => {
            eprintln!("⚠️  Failed to load config, using defaults: {:#}", e);
            Ok((Config::default(), "defaults (config file unreadable)".to_string()))
        }
    }
}
