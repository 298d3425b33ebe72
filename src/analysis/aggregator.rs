//! Aggregation pipeline.
//!
//! Turns the raw order/item/store/product tables into the derived tables the
//! dashboard shows: line revenue, yearly revenue, year-over-year growth,
//! revenue by region and top products.
//!
//! Every join is inner. Rows dropped by a join are never lost silently: each
//! one is recorded as an [`IntegrityWarning`] on the returned [`Joined`].

use crate::error::{IntegrityWarning, PipelineError};
use crate::models::{
    DatedLine, LineItem, Order, OrderItem, OrderLine, Product, ProductQuantity, RegionRevenue,
    SalesData, SalesLine, Store, Table, YearGrowth, YearlyRevenue,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Default number of rows kept in the top-products ranking.
pub const DEFAULT_TOP_PRODUCTS: usize = 10;

/// Knobs that change the pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOptions {
    /// Number of rows kept in the top-products ranking.
    pub top_products_limit: usize,
    /// Extra `chrono` format tried first when parsing order dates.
    pub date_format: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            top_products_limit: DEFAULT_TOP_PRODUCTS,
            date_format: None,
        }
    }
}

/// Rows that survived a join, plus a warning for every row that did not.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined<T> {
    pub rows: Vec<T>,
    pub dropped: Vec<IntegrityWarning>,
}

/// Every derived table produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub line_items: Vec<LineItem>,
    /// Sum of all line revenue, before any join.
    pub total_revenue: f64,
    pub yearly_revenue: Vec<YearlyRevenue>,
    pub growth: Vec<YearGrowth>,
    pub region_revenue: Vec<RegionRevenue>,
    pub top_products: Vec<ProductQuantity>,
    /// Line items that joined all the way through to a region.
    pub sales_lines: Vec<SalesLine>,
    pub regions: Vec<String>,
    pub product_names: Vec<String>,
    pub warnings: Vec<IntegrityWarning>,
}

/// Compute `quantity * list_price * (1 - discount)` for every item.
///
/// Rejects non-positive quantities, negative or non-finite prices, and
/// discounts outside `[0, 1]`. Also rejects a line revenue that overflows
/// `f64`, and quantities whose running total overflows `i64`, so every
/// downstream quantity sum fits.
pub fn compute_line_revenue(items: &[OrderItem]) -> Result<Vec<LineItem>, PipelineError> {
    let mut total_quantity: i64 = 0;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| -> Result<LineItem, PipelineError> {
            validate_item(item, index)?;

            total_quantity = total_quantity.checked_add(item.quantity).ok_or_else(|| {
                PipelineError::invalid(
                    Table::OrderItems,
                    item_location(item, index),
                    "total quantity overflows i64",
                )
            })?;

            let total_price = item.quantity as f64 * item.list_price * (1.0 - item.discount);
            if !total_price.is_finite() {
                return Err(PipelineError::invalid(
                    Table::OrderItems,
                    item_location(item, index),
                    format!(
                        "line revenue of {} x {} is not finite",
                        item.quantity, item.list_price
                    ),
                ));
            }

            Ok(LineItem {
                order_id: item.order_id.clone(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                list_price: item.list_price,
                discount: item.discount,
                total_price,
            })
        })
        .collect()
}

fn item_location(item: &OrderItem, index: usize) -> String {
    format!("row {}, order_id {}", index + 1, item.order_id)
}

fn validate_item(item: &OrderItem, index: usize) -> Result<(), PipelineError> {
    let location = || item_location(item, index);

    if item.quantity <= 0 {
        return Err(PipelineError::invalid(
            Table::OrderItems,
            location(),
            format!("quantity must be positive, got {}", item.quantity),
        ));
    }
    if !item.list_price.is_finite() || item.list_price < 0.0 {
        return Err(PipelineError::invalid(
            Table::OrderItems,
            location(),
            format!("list_price must be non-negative, got {}", item.list_price),
        ));
    }
    if !item.discount.is_finite() || !(0.0..=1.0).contains(&item.discount) {
        return Err(PipelineError::invalid(
            Table::OrderItems,
            location(),
            format!("discount {} outside [0, 1]", item.discount),
        ));
    }

    Ok(())
}

/// Sum of line revenue over all items.
pub fn total_revenue(items: &[LineItem]) -> f64 {
    items.iter().map(|i| i.total_price).sum()
}

/// Inner join of line items to their orders on `order_id`.
pub fn join_orders_items(orders: &[Order], items: &[LineItem]) -> Joined<OrderLine> {
    let mut by_id: HashMap<&str, &Order> = HashMap::with_capacity(orders.len());
    for order in orders {
        if by_id.insert(order.order_id.as_str(), order).is_some() {
            debug!("Duplicate order_id {}, keeping the last row", order.order_id);
        }
    }

    let mut rows = Vec::with_capacity(items.len());
    let mut dropped = Vec::new();

    for item in items {
        match by_id.get(item.order_id.as_str()) {
            Some(order) => rows.push(OrderLine {
                order_id: item.order_id.clone(),
                store_id: order.store_id.clone(),
                order_date: order.order_date.clone(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                total_price: item.total_price,
            }),
            None => dropped.push(IntegrityWarning {
                table: Table::OrderItems,
                column: "order_id".to_string(),
                value: item.order_id.clone(),
                referenced: Table::Orders,
                dropped_revenue: item.total_price,
            }),
        }
    }

    Joined { rows, dropped }
}

/// Parse an order date.
///
/// Tries `format` first when given, then `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` and RFC 3339.
pub fn parse_order_date(raw: &str, format: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Some(fmt) = format {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Check that every order date parses, including orders with no items.
pub fn validate_order_dates(
    orders: &[Order],
    date_format: Option<&str>,
) -> Result<(), PipelineError> {
    match orders
        .iter()
        .find(|o| parse_order_date(&o.order_date, date_format).is_none())
    {
        Some(order) => Err(unparseable_date(&order.order_id, &order.order_date)),
        None => Ok(()),
    }
}

fn unparseable_date(order_id: &str, raw: &str) -> PipelineError {
    PipelineError::invalid(
        Table::Orders,
        format!("order_id {}", order_id),
        format!("unparseable order_date '{}'", raw),
    )
}

/// Attach the calendar year of each line's order date.
pub fn derive_year(
    lines: Vec<OrderLine>,
    date_format: Option<&str>,
) -> Result<Vec<DatedLine>, PipelineError> {
    let mut years: HashMap<String, i32> = HashMap::new();
    let mut dated = Vec::with_capacity(lines.len());

    for line in lines {
        let year = match years.get(&line.order_date) {
            Some(year) => *year,
            None => {
                let date = parse_order_date(&line.order_date, date_format)
                    .ok_or_else(|| unparseable_date(&line.order_id, &line.order_date))?;
                years.insert(line.order_date.clone(), date.year());
                date.year()
            }
        };

        dated.push(DatedLine {
            order_id: line.order_id,
            store_id: line.store_id,
            year,
            product_id: line.product_id,
            quantity: line.quantity,
            total_price: line.total_price,
        });
    }

    Ok(dated)
}

/// Revenue per calendar year, ascending by year.
pub fn aggregate_yearly_revenue(lines: &[DatedLine]) -> Vec<YearlyRevenue> {
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();

    for line in lines {
        *by_year.entry(line.year).or_default() += line.total_price;
    }

    by_year
        .into_iter()
        .map(|(year, revenue)| YearlyRevenue { year, revenue })
        .collect()
}

/// Percentage change against the previous entry of the series.
///
/// The first year has no growth and is absent. A year whose predecessor had
/// zero revenue, or whose change does not fit in an `f64`, is absent as well.
pub fn compute_growth(yearly: &[YearlyRevenue]) -> Vec<YearGrowth> {
    yearly
        .windows(2)
        .filter_map(|pair| {
            let (previous, current) = (&pair[0], &pair[1]);
            if previous.revenue == 0.0 {
                debug!(
                    "No revenue in {}, growth for {} is undefined",
                    previous.year, current.year
                );
                return None;
            }
            let growth_pct = (current.revenue - previous.revenue) / previous.revenue * 100.0;
            if !growth_pct.is_finite() {
                debug!("Growth for {} overflows, treating as undefined", current.year);
                return None;
            }
            Some(YearGrowth {
                year: current.year,
                previous_year: previous.year,
                growth_pct,
            })
        })
        .collect()
}

/// Growth for `year`, or zero when it is undefined.
pub fn growth_for(growth: &[YearGrowth], year: i32) -> f64 {
    growth
        .iter()
        .find(|g| g.year == year)
        .map(|g| g.growth_pct)
        .unwrap_or(0.0)
}

/// The most recent two years of the series, oldest first.
pub fn latest_two_years(yearly: &[YearlyRevenue]) -> Vec<i32> {
    let start = yearly.len().saturating_sub(2);
    yearly[start..].iter().map(|y| y.year).collect()
}

/// Inner join of dated lines to their stores on `store_id`.
pub fn join_stores(lines: &[DatedLine], stores: &[Store]) -> Joined<SalesLine> {
    let by_id: HashMap<&str, &Store> = stores.iter().map(|s| (s.store_id.as_str(), s)).collect();

    let mut rows = Vec::with_capacity(lines.len());
    let mut dropped = Vec::new();

    for line in lines {
        match by_id.get(line.store_id.as_str()) {
            Some(store) => rows.push(SalesLine {
                order_id: line.order_id.clone(),
                store_id: line.store_id.clone(),
                state: store.state.clone(),
                year: line.year,
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                total_price: line.total_price,
            }),
            None => dropped.push(IntegrityWarning {
                table: Table::Orders,
                column: "store_id".to_string(),
                value: line.store_id.clone(),
                referenced: Table::Stores,
                dropped_revenue: line.total_price,
            }),
        }
    }

    Joined { rows, dropped }
}

/// Revenue per region, ascending by state.
pub fn aggregate_region_revenue(lines: &[SalesLine]) -> Vec<RegionRevenue> {
    let mut by_state: BTreeMap<&str, f64> = BTreeMap::new();

    for line in lines {
        *by_state.entry(line.state.as_str()).or_default() += line.total_price;
    }

    by_state
        .into_iter()
        .map(|(state, revenue)| RegionRevenue {
            state: state.to_string(),
            revenue,
        })
        .collect()
}

/// Units sold per product name, highest first, truncated to `limit`.
///
/// Ties are broken by product name ascending.
pub fn aggregate_top_products(
    items: &[LineItem],
    products: &[Product],
    limit: usize,
) -> Joined<ProductQuantity> {
    let names: HashMap<&str, &str> = products
        .iter()
        .map(|p| (p.product_id.as_str(), p.product_name.as_str()))
        .collect();

    let mut by_name: BTreeMap<&str, i64> = BTreeMap::new();
    let mut dropped = Vec::new();

    for item in items {
        match names.get(item.product_id.as_str()) {
            Some(name) => *by_name.entry(*name).or_default() += item.quantity,
            None => dropped.push(IntegrityWarning {
                table: Table::OrderItems,
                column: "product_id".to_string(),
                value: item.product_id.clone(),
                referenced: Table::Products,
                dropped_revenue: item.total_price,
            }),
        }
    }

    let mut rows: Vec<ProductQuantity> = by_name
        .into_iter()
        .map(|(name, quantity)| ProductQuantity {
            product_name: name.to_string(),
            quantity,
        })
        .collect();

    // Stable sort over a name-ordered vector keeps the name tiebreak.
    rows.sort_by_key(|p| std::cmp::Reverse(p.quantity));
    rows.truncate(limit);

    Joined { rows, dropped }
}

/// Distinct region labels, sorted.
pub fn distinct_regions(stores: &[Store]) -> Vec<String> {
    stores
        .iter()
        .map(|s| s.state.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct product names, sorted.
pub fn distinct_product_names(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .map(|p| p.product_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn ensure_finite(value: f64, location: impl Into<String>) -> Result<(), PipelineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PipelineError::invalid(
            Table::OrderItems,
            location,
            "revenue sum overflows f64",
        ))
    }
}

/// Run the whole pipeline over the four input tables.
pub fn run_pipeline(
    data: &SalesData,
    options: &PipelineOptions,
) -> Result<Aggregates, PipelineError> {
    let line_items = compute_line_revenue(&data.order_items)?;
    let total_revenue = total_revenue(&line_items);
    ensure_finite(total_revenue, "total revenue")?;
    debug!(
        "Computed line revenue for {} items, total {:.2}",
        line_items.len(),
        total_revenue
    );

    let mut warnings = Vec::new();

    validate_order_dates(&data.orders, options.date_format.as_deref())?;
    let joined = join_orders_items(&data.orders, &line_items);
    warnings.extend(joined.dropped);

    let dated = derive_year(joined.rows, options.date_format.as_deref())?;
    let yearly_revenue = aggregate_yearly_revenue(&dated);
    for yearly in &yearly_revenue {
        ensure_finite(yearly.revenue, format!("year {}", yearly.year))?;
    }
    let growth = compute_growth(&yearly_revenue);

    let with_state = join_stores(&dated, &data.stores);
    warnings.extend(with_state.dropped);
    let region_revenue = aggregate_region_revenue(&with_state.rows);
    for region in &region_revenue {
        ensure_finite(region.revenue, format!("state {}", region.state))?;
    }

    let top = aggregate_top_products(&line_items, &data.products, options.top_products_limit);
    warnings.extend(top.dropped);

    if !warnings.is_empty() {
        warn!(
            "{} rows dropped by joins on dangling keys",
            warnings.len()
        );
    }

    info!(
        "Aggregated {} years, {} regions, {} top products",
        yearly_revenue.len(),
        region_revenue.len(),
        top.rows.len()
    );

    Ok(Aggregates {
        line_items,
        total_revenue,
        yearly_revenue,
        growth,
        region_revenue,
        top_products: top.rows,
        sales_lines: with_state.rows,
        regions: distinct_regions(&data.stores),
        product_names: distinct_product_names(&data.products),
        warnings,
    })
}
