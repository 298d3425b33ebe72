//! Markdown and JSON dashboard generation.
//!
//! This module renders the [`Dashboard`] model as a Markdown document with
//! KPI cards, chart-ready tables and the current filter selection, or as
//! pretty-printed JSON.

use crate::error::IntegrityWarning;
use crate::models::{
    Dashboard, DashboardMetadata, FilterView, KpiCards, ProductQuantity, RegionRevenue,
    YearGrowth, YearlyRevenue,
};
use anyhow::Result;

/// Rendering settings.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub currency_symbol: String,
    pub include_warnings: bool,
    pub max_warnings: usize,
    pub bar_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            include_warnings: true,
            max_warnings: 50,
            bar_width: 30,
        }
    }
}

impl From<&crate::config::Config> for RenderOptions {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            currency_symbol: config.dashboard.currency_symbol.clone(),
            include_warnings: config.report.include_warnings,
            max_warnings: config.report.max_warnings,
            bar_width: config.report.bar_width,
        }
    }
}

/// Format an amount with a currency symbol, thousands separators and two
/// decimals, e.g. `$1,234.56`.
pub fn format_currency(amount: f64, symbol: &str) -> String {
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}{}.{:02}", sign, symbol, grouped, fraction)
}

/// Format a percentage with two decimals, e.g. `12.34%`.
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Generate a complete Markdown dashboard.
pub fn generate_markdown_report(dashboard: &Dashboard, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# 📊 Sales Dashboard\n\n");

    output.push_str(&generate_metadata_section(&dashboard.metadata));
    output.push_str(&generate_kpi_section(&dashboard.kpis));
    output.push_str(&generate_region_section(
        &dashboard.region_revenue,
        options,
    ));
    output.push_str(&generate_growth_section(
        &dashboard.yearly_revenue,
        &dashboard.growth,
        options,
    ));
    output.push_str(&generate_top_products_section(&dashboard.top_products));
    output.push_str(&generate_selection_section(
        &dashboard.filter_view,
        options,
    ));
    output.push_str(&generate_filters_section(
        &dashboard.regions,
        &dashboard.product_names,
    ));

    if options.include_warnings {
        output.push_str(&generate_warnings_section(
            &dashboard.warnings,
            options.max_warnings,
        ));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data Source:** `{}`\n", metadata.data_source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Rows Loaded:** {} orders, {} order items, {} stores, {} products\n",
        metadata.row_counts.orders,
        metadata.row_counts.order_items,
        metadata.row_counts.stores,
        metadata.row_counts.products
    ));
    section.push_str(&format!(
        "- **Input Fingerprint:** `{}`\n",
        short_fingerprint(&metadata.fingerprint)
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..16).unwrap_or(fingerprint)
}

/// Generate the KPI cards.
fn generate_kpi_section(kpis: &KpiCards) -> String {
    let mut section = String::new();

    section.push_str("## Key Figures\n\n");

    let mut header = String::from("| Total Revenue |");
    let mut align = String::from("|:---:|");
    let mut values = format!("| **{}** |", kpis.total_revenue_display);

    for card in &kpis.growth {
        header.push_str(&format!(" Growth {} |", card.year));
        align.push_str(":---:|");
        values.push_str(&format!(" {} |", format_percent(card.growth_pct)));
    }

    section.push_str(&header);
    section.push('\n');
    section.push_str(&align);
    section.push('\n');
    section.push_str(&values);
    section.push_str("\n\n");

    section
}

/// Generate the revenue-by-region chart table.
fn generate_region_section(regions: &[RegionRevenue], options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str("## 📍 Revenue by Region\n\n");

    if regions.is_empty() {
        section.push_str("No regional revenue.\n\n");
        return section;
    }

    let max = regions.iter().map(|r| r.revenue).fold(0.0_f64, f64::max);

    section.push_str("| Region | Revenue | |\n");
    section.push_str("|:---|---:|:---|\n");
    for region in regions {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            region.state,
            format_currency(region.revenue, &options.currency_symbol),
            text_bar(region.revenue, max, options.bar_width)
        ));
    }
    section.push('\n');

    section
}

/// A bar of `width` cells scaled against `max`.
fn text_bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "█".repeat(cells.clamp(1, width))
}

/// Generate the yearly revenue and growth table.
fn generate_growth_section(
    yearly: &[YearlyRevenue],
    growth: &[YearGrowth],
    options: &RenderOptions,
) -> String {
    let mut section = String::new();

    section.push_str("## 📈 Yearly Revenue and Growth\n\n");

    if yearly.is_empty() {
        section.push_str("No dated revenue.\n\n");
        return section;
    }

    section.push_str("| Year | Revenue | Growth |\n");
    section.push_str("|:---:|---:|---:|\n");
    for entry in yearly {
        let change = growth
            .iter()
            .find(|g| g.year == entry.year)
            .map(|g| format_percent(g.growth_pct))
            .unwrap_or_else(|| "-".to_string());
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            entry.year,
            format_currency(entry.revenue, &options.currency_symbol),
            change
        ));
    }
    section.push('\n');

    section
}

/// Generate the top products ranking.
fn generate_top_products_section(products: &[ProductQuantity]) -> String {
    let mut section = String::new();

    section.push_str("## 🏆 Top Products\n\n");

    if products.is_empty() {
        section.push_str("No products sold.\n\n");
        return section;
    }

    section.push_str("| # | Product | Units |\n");
    section.push_str("|:---:|:---|---:|\n");
    for (i, product) in products.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            i + 1,
            product.product_name,
            product.quantity
        ));
    }
    section.push('\n');

    section
}

/// Generate the current selection section.
fn generate_selection_section(view: &FilterView, options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str("## 🔎 Current Selection\n\n");
    section.push_str(&format!("- **Region:** {}\n", view.region));
    section.push_str(&format!("- **Product:** {}\n", view.product));
    section.push_str(&format!(
        "- **Revenue:** {}\n",
        format_currency(view.revenue, &options.currency_symbol)
    ));
    section.push_str(&format!("- **Units:** {}\n", view.quantity));
    section.push_str(&format!("- **Order Lines:** {}\n", view.line_count));

    if let Some(revenue) = view.region_revenue {
        section.push_str(&format!(
            "\n### Sales in {}: {}\n",
            view.region,
            format_currency(revenue, &options.currency_symbol)
        ));
    }
    if let Some(quantity) = view.product_quantity {
        section.push_str(&format!(
            "\n### Units of product {} across all orders: {}\n",
            view.product, quantity
        ));
    }
    section.push('\n');

    section
}

/// Generate the selector values section.
fn generate_filters_section(regions: &[String], product_names: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## Filters\n\n");
    section.push_str(&format!(
        "- **Regions ({}):** {}\n",
        regions.len(),
        regions.join(", ")
    ));
    section.push_str(&format!("- **Products:** {}\n\n", product_names.len()));

    section
}

/// Generate the integrity warnings section.
fn generate_warnings_section(warnings: &[IntegrityWarning], max: usize) -> String {
    if warnings.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## ⚠️ Data Integrity Warnings\n\n");
    section.push_str(&format!(
        "{} rows were dropped because a referenced key has no matching row:\n\n",
        warnings.len()
    ));

    for warning in warnings.iter().take(max) {
        section.push_str(&format!("- {}\n", warning));
    }
    if warnings.len() > max {
        section.push_str(&format!("- ... and {} more\n", warnings.len() - max));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Dashboard generated by salesdash v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON dashboard.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}
