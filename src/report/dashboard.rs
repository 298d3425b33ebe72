//! Dashboard assembly.
//!
//! Combines the pipeline output with the current region/product selection
//! into the [`Dashboard`] model the renderers consume.

use crate::analysis::{
    filter_by_product, filter_by_region, growth_for, latest_two_years, Aggregates,
};
use crate::models::{Dashboard, DashboardMetadata, FilterView, GrowthCard, KpiCards, Selection};
use crate::report::format_currency;
use tracing::warn;

/// Build the headline KPI cards.
///
/// Growth cards cover the most recent two years; a year with no defined
/// growth shows zero.
pub fn build_kpis(aggregates: &Aggregates, currency_symbol: &str) -> KpiCards {
    let growth = latest_two_years(&aggregates.yearly_revenue)
        .into_iter()
        .map(|year| GrowthCard {
            year,
            growth_pct: growth_for(&aggregates.growth, year),
        })
        .collect();

    KpiCards {
        total_revenue: aggregates.total_revenue,
        total_revenue_display: format_currency(aggregates.total_revenue, currency_symbol),
        growth,
    }
}

/// Figures for the rows matching both filters.
pub fn build_filter_view(
    aggregates: &Aggregates,
    region: &Selection<String>,
    product: &Selection<String>,
) -> FilterView {
    if let Selection::Specific(state) = region {
        if !aggregates.regions.iter().any(|r| r == state) {
            warn!("Region '{}' not found in stores; selection is empty", state);
        }
    }

    let lines = filter_by_product(&filter_by_region(&aggregates.sales_lines, region), product);

    let region_revenue = match region {
        Selection::All => None,
        Selection::Specific(_) => filter_by_region(&aggregates.region_revenue, region)
            .first()
            .map(|r| r.revenue),
    };

    let product_quantity = match product {
        Selection::All => None,
        Selection::Specific(_) => Some(
            filter_by_product(&aggregates.line_items, product)
                .iter()
                .map(|item| item.quantity)
                .sum(),
        ),
    };

    FilterView {
        region: region.clone(),
        product: product.clone(),
        revenue: lines.iter().map(|l| l.total_price).sum(),
        quantity: lines.iter().map(|l| l.quantity).sum(),
        line_count: lines.len(),
        region_revenue,
        product_quantity,
    }
}

/// Assemble the complete dashboard.
pub fn build_dashboard(
    aggregates: &Aggregates,
    metadata: DashboardMetadata,
    region: &Selection<String>,
    product: &Selection<String>,
    currency_symbol: &str,
) -> Dashboard {
    Dashboard {
        metadata,
        kpis: build_kpis(aggregates, currency_symbol),
        yearly_revenue: aggregates.yearly_revenue.clone(),
        growth: aggregates.growth.clone(),
        region_revenue: aggregates.region_revenue.clone(),
        top_products: aggregates.top_products.clone(),
        filter_view: build_filter_view(aggregates, region, product),
        regions: aggregates.regions.clone(),
        product_names: aggregates.product_names.clone(),
        warnings: aggregates.warnings.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{run_pipeline, PipelineOptions};
    use crate::models::{Order, OrderItem, Product, RowCounts, SalesData, Store};
    use chrono::Utc;

    fn data() -> SalesData {
        let order = |id: &str, store: &str, date: &str| Order {
            order_id: id.to_string(),
            store_id: store.to_string(),
            order_date: date.to_string(),
        };
        let item = |order: &str, product: &str, quantity: i64, price: f64| OrderItem {
            order_id: order.to_string(),
            product_id: product.to_string(),
            quantity,
            list_price: price,
            discount: 0.0,
        };

        SalesData {
            orders: vec![
                order("1", "S1", "2017-01-15"),
                order("2", "S2", "2018-02-01"),
                order("3", "S1", "2018-06-30"),
            ],
            order_items: vec![
                item("1", "P1", 1, 100.0),
                item("2", "P2", 2, 50.0),
                item("3", "P1", 1, 50.0),
            ],
            stores: vec![
                Store {
                    store_id: "S1".to_string(),
                    state: "CA".to_string(),
                },
                Store {
                    store_id: "S2".to_string(),
                    state: "NY".to_string(),
                },
            ],
            products: vec![
                Product {
                    product_id: "P1".to_string(),
                    product_name: "Widget".to_string(),
                },
                Product {
                    product_id: "P2".to_string(),
                    product_name: "Gadget".to_string(),
                },
            ],
        }
    }

    fn aggregates() -> Aggregates {
        run_pipeline(&data(), &PipelineOptions::default()).unwrap()
    }

    fn metadata() -> DashboardMetadata {
        DashboardMetadata {
            data_source: "data".to_string(),
            generated_at: Utc::now(),
            row_counts: RowCounts::default(),
            fingerprint: "abc".to_string(),
            duration_seconds: 0.1,
        }
    }

    #[test]
    fn test_kpis_use_latest_two_years() {
        let kpis = build_kpis(&aggregates(), "$");

        assert_eq!(kpis.total_revenue_display, "$250.00");
        let cards: Vec<(i32, f64)> = kpis.growth.iter().map(|g| (g.year, g.growth_pct)).collect();
        assert_eq!(cards, vec![(2017, 0.0), (2018, 50.0)]);
    }

    #[test]
    fn test_filter_view_all_matches_totals() {
        let aggregates = aggregates();
        let view = build_filter_view(&aggregates, &Selection::All, &Selection::All);

        assert!((view.revenue - aggregates.total_revenue).abs() < 1e-9);
        assert_eq!(view.quantity, 4);
        assert_eq!(view.line_count, 3);
        assert_eq!(view.region_revenue, None);
        assert_eq!(view.product_quantity, None);
    }

    #[test]
    fn test_filter_view_region_and_product() {
        let aggregates = aggregates();
        let view = build_filter_view(
            &aggregates,
            &Selection::Specific("CA".to_string()),
            &Selection::Specific("P1".to_string()),
        );

        assert!((view.revenue - 150.0).abs() < 1e-9);
        assert_eq!(view.line_count, 2);
        assert_eq!(view.region_revenue, Some(150.0));
        assert_eq!(view.product_quantity, Some(2));
    }

    #[test]
    fn test_filter_view_unknown_region_is_empty() {
        let view = build_filter_view(
            &aggregates(),
            &Selection::Specific("ZZ".to_string()),
            &Selection::All,
        );

        assert_eq!(view.line_count, 0);
        assert_eq!(view.revenue, 0.0);
        assert_eq!(view.region_revenue, None);
    }

    #[test]
    fn test_build_dashboard_does_not_alter_tables() {
        let aggregates = aggregates();
        let dashboard = build_dashboard(
            &aggregates,
            metadata(),
            &Selection::Specific("NY".to_string()),
            &Selection::All,
            "$",
        );

        assert_eq!(dashboard.region_revenue, aggregates.region_revenue);
        assert_eq!(dashboard.regions, vec!["CA", "NY"]);
        assert_eq!(dashboard.product_names, vec!["Gadget", "Widget"]);
        assert!((dashboard.filter_view.revenue - 100.0).abs() < 1e-9);
    }
}
