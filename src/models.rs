//! Data models for the sales dashboard.
//!
//! This module contains the input rows supplied by the loader, the derived
//! rows produced by the aggregation pipeline, and the dashboard report model
//! handed to the renderers.

use crate::error::IntegrityWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four input tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Orders,
    OrderItems,
    Stores,
    Products,
}

impl Table {
    /// All tables, in load order.
    pub const ALL: [Table; 4] = [
        Table::Orders,
        Table::OrderItems,
        Table::Stores,
        Table::Products,
    ];

    /// Default CSV file name for the table.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Table::Orders => "orders.csv",
            Table::OrderItems => "order_items.csv",
            Table::Stores => "stores.csv",
            Table::Products => "products.csv",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Orders => write!(f, "orders"),
            Table::OrderItems => write!(f, "order_items"),
            Table::Stores => write!(f, "stores"),
            Table::Products => write!(f, "products"),
        }
    }
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub store_id: String,
    /// Raw date text as supplied; parsed when the year is derived.
    pub order_date: String,
}

/// A single line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub list_price: f64,
    /// Fraction in [0, 1].
    pub discount: f64,
}

/// A store and the region it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub store_id: String,
    /// Region label.
    pub state: String,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
}

/// The four input tables, fully materialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesData {
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
    pub stores: Vec<Store>,
    pub products: Vec<Product>,
}

impl SalesData {
    /// Row counts per table, in load order.
    pub fn row_counts(&self) -> RowCounts {
        RowCounts {
            orders: self.orders.len(),
            order_items: self.order_items.len(),
            stores: self.stores.len(),
            products: self.products.len(),
        }
    }
}

/// An order item with its line revenue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub list_price: f64,
    pub discount: f64,
    /// `quantity * list_price * (1 - discount)`
    pub total_price: f64,
}

/// A line item joined to its order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub order_id: String,
    pub store_id: String,
    pub order_date: String,
    pub product_id: String,
    pub quantity: i64,
    pub total_price: f64,
}

/// An order line with the calendar year of its order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatedLine {
    pub order_id: String,
    pub store_id: String,
    pub year: i32,
    pub product_id: String,
    pub quantity: i64,
    pub total_price: f64,
}

/// A dated line joined to its store's region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesLine {
    pub order_id: String,
    pub store_id: String,
    pub state: String,
    pub year: i32,
    pub product_id: String,
    pub quantity: i64,
    pub total_price: f64,
}

/// Revenue for one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyRevenue {
    pub year: i32,
    pub revenue: f64,
}

/// Percentage change in revenue against the previous year of the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearGrowth {
    pub year: i32,
    pub previous_year: i32,
    pub growth_pct: f64,
}

/// Revenue for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRevenue {
    pub state: String,
    pub revenue: f64,
}

/// Units sold for one product name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductQuantity {
    pub product_name: String,
    pub quantity: i64,
}

/// A filter choice: everything, or one specific value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Selection<T> {
    #[default]
    All,
    Specific(T),
}

impl<T> Selection<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

impl<T> From<Option<T>> for Selection<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Selection::Specific(v),
            None => Selection::All,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "All"),
            Selection::Specific(v) => write!(f, "{}", v),
        }
    }
}

/// Number of rows loaded per input table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    pub orders: usize,
    pub order_items: usize,
    pub stores: usize,
    pub products: usize,
}

/// A growth KPI card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthCard {
    pub year: i32,
    /// Zero when the year has no defined growth.
    pub growth_pct: f64,
}

/// Headline figures shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiCards {
    pub total_revenue: f64,
    /// Currency-formatted total, e.g. `$1,234.56`.
    pub total_revenue_display: String,
    /// Growth for the most recent two years of the series, oldest first.
    pub growth: Vec<GrowthCard>,
}

/// Figures for the current region/product selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterView {
    pub region: Selection<String>,
    pub product: Selection<String>,
    pub revenue: f64,
    pub quantity: i64,
    pub line_count: usize,
    /// Revenue of the selected region, when one is selected and known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_revenue: Option<f64>,
    /// Units of the selected product across all order items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_quantity: Option<i64>,
}

/// Metadata about the dashboard run.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetadata {
    /// Where the input tables were read from.
    pub data_source: String,
    /// Date and time the dashboard was generated.
    pub generated_at: DateTime<Utc>,
    /// Rows loaded per table.
    pub row_counts: RowCounts,
    /// Input fingerprint used as the cache key.
    pub fingerprint: String,
    /// Duration of load + pipeline in seconds.
    pub duration_seconds: f64,
}

/// The complete dashboard handed to the renderers.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    pub kpis: KpiCards,
    pub yearly_revenue: Vec<YearlyRevenue>,
    pub growth: Vec<YearGrowth>,
    pub region_revenue: Vec<RegionRevenue>,
    pub top_products: Vec<ProductQuantity>,
    pub filter_view: FilterView,
    /// Selector values for the region filter.
    pub regions: Vec<String>,
    /// Selector values for the product filter.
    pub product_names: Vec<String>,
    pub warnings: Vec<IntegrityWarning>,
}
