//! CSV loading for the four input tables.
//!
//! This module locates the order, order item, store and product tables in a
//! data directory and deserializes them into typed rows. Extra columns are
//! ignored; missing files and malformed rows become typed errors.

use crate::error::PipelineError;
use crate::models::{Order, OrderItem, Product, SalesData, Store, Table};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// File names of the input tables inside the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFiles {
    pub orders: String,
    pub order_items: String,
    pub stores: String,
    pub products: String,
}

impl Default for TableFiles {
    fn default() -> Self {
        Self {
            orders: Table::Orders.default_file_name().to_string(),
            order_items: Table::OrderItems.default_file_name().to_string(),
            stores: Table::Stores.default_file_name().to_string(),
            products: Table::Products.default_file_name().to_string(),
        }
    }
}

impl From<&crate::config::DataConfig> for TableFiles {
    fn from(config: &crate::config::DataConfig) -> Self {
        Self {
            orders: config.orders_file.clone(),
            order_items: config.order_items_file.clone(),
            stores: config.stores_file.clone(),
            products: config.products_file.clone(),
        }
    }
}

impl TableFiles {
    /// File name configured for `table`.
    pub fn file_name(&self, table: Table) -> &str {
        match table {
            Table::Orders => &self.orders,
            Table::OrderItems => &self.order_items,
            Table::Stores => &self.stores,
            Table::Products => &self.products,
        }
    }

    /// Table whose configured file name is `name`, if any.
    pub fn table_for(&self, name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| self.file_name(*t) == name)
    }
}

/// Options for loading.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Whether to show a progress bar.
    pub show_progress: bool,
}

/// A CSV file found in the data directory.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the data directory.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Table the file is loaded as, if it matches a configured name.
    pub table: Option<Table>,
}

/// A directory holding the four input tables.
pub struct DataSource {
    root: PathBuf,
    files: TableFiles,
}

impl DataSource {
    /// Create a data source rooted at `root`.
    pub fn new(root: PathBuf, files: TableFiles) -> Self {
        Self { root, files }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the file backing `table`.
    pub fn path_for(&self, table: Table) -> PathBuf {
        self.root.join(self.files.file_name(table))
    }

    /// Tables whose file is absent.
    pub fn missing_tables(&self) -> Vec<Table> {
        Table::ALL
            .into_iter()
            .filter(|t| !self.path_for(*t).is_file())
            .collect()
    }

    /// Load all four tables.
    pub fn load(&self, options: &LoadOptions) -> Result<SalesData, PipelineError> {
        let progress = if options.show_progress {
            let pb = ProgressBar::new(Table::ALL.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:20.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let step = |table: Table| {
            if let Some(ref pb) = progress {
                pb.set_message(format!("Loading {}", table));
                pb.inc(1);
            }
        };

        step(Table::Orders);
        let orders: Vec<Order> = read_table(&self.path_for(Table::Orders), Table::Orders)?;
        step(Table::OrderItems);
        let order_items: Vec<OrderItem> =
            read_table(&self.path_for(Table::OrderItems), Table::OrderItems)?;
        step(Table::Stores);
        let stores: Vec<Store> = read_table(&self.path_for(Table::Stores), Table::Stores)?;
        step(Table::Products);
        let products: Vec<Product> =
            read_table(&self.path_for(Table::Products), Table::Products)?;

        if let Some(pb) = progress {
            pb.finish_with_message("Data loaded");
        }

        let data = SalesData {
            orders,
            order_items,
            stores,
            products,
        };
        let counts = data.row_counts();
        info!(
            "Loaded {} orders, {} order items, {} stores, {} products from {}",
            counts.orders,
            counts.order_items,
            counts.stores,
            counts.products,
            self.root.display()
        );

        Ok(data)
    }

    /// List the CSV files under the data directory.
    pub fn discover(&self) -> Vec<DiscoveredFile> {
        let mut found: Vec<DiscoveredFile> = WalkDir::new(&self.root)
            .max_depth(2)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
            })
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    debug!("Cannot read entry under {}: {}", self.root.display(), e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .map(|e| {
                let rel_path = e.path().strip_prefix(&self.root).unwrap_or(e.path());
                let name = e.file_name().to_string_lossy();
                let table = if e.depth() == 1 {
                    self.files.table_for(&name)
                } else {
                    None
                };
                DiscoveredFile {
                    path: rel_path.to_string_lossy().to_string(),
                    size: e.metadata().map(|m| m.len()).unwrap_or(0),
                    table,
                }
            })
            .collect();

        found.sort_by(|a, b| a.path.cmp(&b.path));
        found
    }
}

/// Read and parse one table from disk.
fn read_table<T: DeserializeOwned>(path: &Path, table: Table) -> Result<Vec<T>, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::MissingFile {
            table,
            path: path.to_path_buf(),
        });
    }

    let text = fs::read_to_string(path).map_err(|source| PipelineError::Io {
        table,
        path: path.to_path_buf(),
        source,
    })?;

    let rows = parse_table(&text, table)?;
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parse CSV text with a header row into typed rows.
pub fn parse_table<T: DeserializeOwned>(text: &str, table: Table) -> Result<Vec<T>, PipelineError> {
    // Strip UTF-8 BOM if present
    let text = text.trim_start_matches('\u{FEFF}');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    reader
        .deserialize::<T>()
        .enumerate()
        .map(|(index, result)| {
            result.map_err(|e| {
                let location = e
                    .position()
                    .map(|p| format!("line {}", p.line()))
                    .unwrap_or_else(|| format!("record {}", index + 1));
                PipelineError::invalid(table, location, e.to_string())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ORDERS: &str = "order_id,customer_id,order_status,order_date,store_id\n\
                          1,259,4,2016-01-01,1\n\
                          2,1212,4,2017-02-03,2\n";
    const ORDER_ITEMS: &str = "order_id,item_id,product_id,quantity,list_price,discount\n\
                               1,1,20,1,599.99,0.2\n\
                               2,1,8,2,1799.99,0.07\n";
    const STORES: &str = "store_id,store_name,state\n1,Santa Cruz Bikes,CA\n2,Baldwin Bikes,NY\n";
    const PRODUCTS: &str = "product_id,product_name\n20,Electra Townie\n8,Trek Remedy\n";

    fn write_data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("orders.csv"), ORDERS).unwrap();
        fs::write(dir.path().join("order_items.csv"), ORDER_ITEMS).unwrap();
        fs::write(dir.path().join("stores.csv"), STORES).unwrap();
        fs::write(dir.path().join("products.csv"), PRODUCTS).unwrap();
        dir
    }

    #[test]
    fn test_load_ignores_extra_columns() {
        let dir = write_data_dir();
        let source = DataSource::new(dir.path().to_path_buf(), TableFiles::default());

        let data = source.load(&LoadOptions::default()).unwrap();

        assert_eq!(data.orders.len(), 2);
        assert_eq!(data.orders[1].order_date, "2017-02-03");
        assert_eq!(data.orders[1].store_id, "2");
        assert_eq!(data.order_items[1].quantity, 2);
        assert!((data.order_items[1].discount - 0.07).abs() < 1e-12);
        assert_eq!(data.stores[0].state, "CA");
        assert_eq!(data.products[1].product_name, "Trek Remedy");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = write_data_dir();
        fs::remove_file(dir.path().join("stores.csv")).unwrap();
        let source = DataSource::new(dir.path().to_path_buf(), TableFiles::default());

        let err = source.load(&LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingFile {
                table: Table::Stores,
                ..
            }
        ));
        assert_eq!(source.missing_tables(), vec![Table::Stores]);
    }

    #[test]
    fn test_parse_strips_bom_and_whitespace() {
        let text = "\u{FEFF}store_id, state\n S1 , CA \n";
        let stores: Vec<Store> = parse_table(text, Table::Stores).unwrap();
        assert_eq!(stores[0].store_id, "S1");
        assert_eq!(stores[0].state, "CA");
    }

    #[test]
    fn test_parse_rejects_missing_value() {
        let text = "order_id,product_id,quantity,list_price,discount\n1,P1,,10.0,0.1\n";
        let err = parse_table::<OrderItem>(text, Table::OrderItems).unwrap_err();

        match err {
            PipelineError::InvalidInput {
                table, location, ..
            } => {
                assert_eq!(table, Table::OrderItems);
                assert_eq!(location, "line 2");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_rejects_missing_column() {
        let text = "order_id,product_id,quantity,list_price\n1,P1,2,10.0\n";
        assert!(parse_table::<OrderItem>(text, Table::OrderItems).is_err());
    }

    #[test]
    fn test_custom_file_names() {
        let dir = write_data_dir();
        fs::rename(
            dir.path().join("orders.csv"),
            dir.path().join("sales_orders.csv"),
        )
        .unwrap();

        let files = TableFiles {
            orders: "sales_orders.csv".to_string(),
            ..TableFiles::default()
        };
        let source = DataSource::new(dir.path().to_path_buf(), files);

        assert!(source.missing_tables().is_empty());
        assert_eq!(source.load(&LoadOptions::default()).unwrap().orders.len(), 2);
    }

    #[test]
    fn test_discover_maps_tables() {
        let dir = write_data_dir();
        fs::write(dir.path().join("customers.csv"), "customer_id\n1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a table").unwrap();
        let source = DataSource::new(dir.path().to_path_buf(), TableFiles::default());

        let found = source.discover();
        let listed: Vec<(&str, Option<Table>)> =
            found.iter().map(|f| (f.path.as_str(), f.table)).collect();

        assert_eq!(
            listed,
            vec![
                ("customers.csv", None),
                ("order_items.csv", Some(Table::OrderItems)),
                ("orders.csv", Some(Table::Orders)),
                ("products.csv", Some(Table::Products)),
                ("stores.csv", Some(Table::Stores)),
            ]
        );
        assert!(found.iter().all(|f| f.size > 0));
    }
}
