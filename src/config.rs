//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.salesdash.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".salesdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Dashboard settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Seconds between reloads in watch mode.
    #[serde(default = "default_watch_interval")]
    pub watch_interval_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            watch_interval_seconds: default_watch_interval(),
        }
    }
}

fn default_output() -> String {
    "sales_dashboard.md".to_string()
}

fn default_watch_interval() -> u64 {
    5
}

/// Input table locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the CSV tables.
    #[serde(default = "default_data_dir")]
    pub directory: String,

    #[serde(default = "default_orders_file")]
    pub orders_file: String,

    #[serde(default = "default_order_items_file")]
    pub order_items_file: String,

    #[serde(default = "default_stores_file")]
    pub stores_file: String,

    #[serde(default = "default_products_file")]
    pub products_file: String,

    /// Extra `chrono` format for order dates (e.g. "%d/%m/%Y").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: default_data_dir(),
            orders_file: default_orders_file(),
            order_items_file: default_order_items_file(),
            stores_file: default_stores_file(),
            products_file: default_products_file(),
            date_format: None,
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_orders_file() -> String {
    "orders.csv".to_string()
}

fn default_order_items_file() -> String {
    "order_items.csv".to_string()
}

fn default_stores_file() -> String {
    "stores.csv".to_string()
}

fn default_products_file() -> String {
    "products.csv".to_string()
}

/// Dashboard content settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Number of products in the top-products ranking.
    #[serde(default = "default_top_products")]
    pub top_products: usize,

    /// Currency symbol for formatted amounts.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Number of pipeline results kept in the cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_products: default_top_products(),
            currency_symbol: default_currency_symbol(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_top_products() -> usize {
    crate::analysis::DEFAULT_TOP_PRODUCTS
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_cache_capacity() -> usize {
    1
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the integrity warnings section.
    #[serde(default = "default_true")]
    pub include_warnings: bool,

    /// Maximum number of warnings listed individually.
    #[serde(default = "default_max_warnings")]
    pub max_warnings: usize,

    /// Width of the text bars in the region chart.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_warnings: true,
            max_warnings: default_max_warnings(),
            bar_width: default_bar_width(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_warnings() -> usize {
    50
}

fn default_bar_width() -> usize {
    30
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided CLI values override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.data.directory = dir.display().to_string();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(top) = args.top {
            self.dashboard.top_products = top;
        }
        if let Some(ref format) = args.date_format {
            self.data.date_format = Some(format.clone());
        }
        if let Some(interval) = args.interval {
            self.general.watch_interval_seconds = interval;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.directory, "data");
        assert_eq!(config.data.orders_file, "orders.csv");
        assert_eq!(config.dashboard.top_products, 10);
        assert_eq!(config.dashboard.currency_symbol, "$");
        assert!(config.report.include_warnings);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_dashboard.md"
verbose = true

[data]
directory = "exports"
stores_file = "shops.csv"
date_format = "%d/%m/%Y"

[dashboard]
top_products = 5
currency_symbol = "€"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_dashboard.md");
        assert!(config.general.verbose);
        assert_eq!(config.data.directory, "exports");
        assert_eq!(config.data.stores_file, "shops.csv");
        assert_eq!(config.data.orders_file, "orders.csv");
        assert_eq!(config.data.date_format.as_deref(), Some("%d/%m/%Y"));
        assert_eq!(config.dashboard.top_products, 5);
        assert_eq!(config.dashboard.currency_symbol, "€");
        assert_eq!(config.report.bar_width, 30);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[dashboard]"));
        assert!(toml_str.contains("[report]"));
    }

    #[test]
    fn test_default_toml_round_trips() {
        let parsed: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(parsed.data.products_file, "products.csv");
        assert_eq!(parsed.general.watch_interval_seconds, 5);
    }
}
