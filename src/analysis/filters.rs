//! Region and product filters over derived tables.
//!
//! Filters never touch their input: they return a new vector holding the
//! matching rows.

use crate::models::{LineItem, RegionRevenue, SalesLine, Selection};

/// Rows that carry a region label.
pub trait RegionKeyed {
    fn region(&self) -> &str;
}

/// Rows that carry a product id.
pub trait ProductKeyed {
    fn product_id(&self) -> &str;
}

impl RegionKeyed for RegionRevenue {
    fn region(&self) -> &str {
        &self.state
    }
}

impl RegionKeyed for SalesLine {
    fn region(&self) -> &str {
        &self.state
    }
}

impl ProductKeyed for SalesLine {
    fn product_id(&self) -> &str {
        &self.product_id
    }
}

impl ProductKeyed for LineItem {
    fn product_id(&self) -> &str {
        &self.product_id
    }
}

/// Keep the rows whose region equals the selected one.
pub fn filter_by_region<T: RegionKeyed + Clone>(rows: &[T], region: &Selection<String>) -> Vec<T> {
    match region {
        Selection::All => rows.to_vec(),
        Selection::Specific(state) => rows
            .iter()
            .filter(|row| row.region() == state)
            .cloned()
            .collect(),
    }
}

/// Keep the rows whose product id equals the selected one.
pub fn filter_by_product<T: ProductKeyed + Clone>(
    rows: &[T],
    product: &Selection<String>,
) -> Vec<T> {
    match product {
        Selection::All => rows.to_vec(),
        Selection::Specific(id) => rows
            .iter()
            .filter(|row| row.product_id() == id)
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<RegionRevenue> {
        vec![
            RegionRevenue {
                state: "CA".to_string(),
                revenue: 10.0,
            },
            RegionRevenue {
                state: "NY".to_string(),
                revenue: 20.0,
            },
        ]
    }

    fn sales_line(state: &str, product: &str) -> SalesLine {
        SalesLine {
            order_id: "1".to_string(),
            store_id: "S1".to_string(),
            state: state.to_string(),
            year: 2018,
            product_id: product.to_string(),
            quantity: 1,
            total_price: 5.0,
        }
    }

    #[test]
    fn test_filter_by_region_all_is_identity() {
        let table = regions();
        assert_eq!(filter_by_region(&table, &Selection::All), table);
    }

    #[test]
    fn test_filter_by_region_specific() {
        let table = regions();
        let filtered = filter_by_region(&table, &Selection::Specific("NY".to_string()));

        assert_eq!(filtered.len(), 1);
        assert!(filtered.iter().all(|r| r.state == "NY"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_filter_by_region_unknown_is_empty() {
        let filtered = filter_by_region(&regions(), &Selection::Specific("ZZ".to_string()));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_filter_by_product() {
        let lines = vec![
            sales_line("CA", "P1"),
            sales_line("CA", "P2"),
            sales_line("NY", "P1"),
        ];

        assert_eq!(filter_by_product(&lines, &Selection::All), lines);

        let p1 = filter_by_product(&lines, &Selection::Specific("P1".to_string()));
        assert_eq!(p1.len(), 2);
        assert!(p1.iter().all(|l| l.product_id == "P1"));
    }

    #[test]
    fn test_filters_compose() {
        let lines = vec![
            sales_line("CA", "P1"),
            sales_line("CA", "P2"),
            sales_line("NY", "P1"),
        ];

        let by_region = filter_by_region(&lines, &Selection::Specific("CA".to_string()));
        let both = filter_by_product(&by_region, &Selection::Specific("P1".to_string()));

        assert_eq!(both, vec![sales_line("CA", "P1")]);
    }
}
