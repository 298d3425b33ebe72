//! Memoized pipeline results.
//!
//! Results are keyed on a blake3 fingerprint of the four input tables and the
//! pipeline options, so any change to the inputs produces a new key. The cache
//! is owned by a single caller and computes through `&mut self`, which keeps
//! at most one computation per key in flight.

use crate::analysis::aggregator::{run_pipeline, Aggregates, PipelineOptions};
use crate::models::SalesData;
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Hex blake3 digest of the inputs and options.
pub fn fingerprint(data: &SalesData, options: &PipelineOptions) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, data).context("Failed to hash input tables")?;
    serde_json::to_writer(&mut hasher, options).context("Failed to hash pipeline options")?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone)]
pub struct CachedRun {
    pub fingerprint: String,
    pub aggregates: Arc<Aggregates>,
    /// True when the result came from the cache.
    pub hit: bool,
}

/// Bounded cache of pipeline results, oldest evicted first.
#[derive(Debug)]
pub struct PipelineCache {
    entries: VecDeque<(String, Arc<Aggregates>)>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl Default for PipelineCache {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PipelineCache {
    /// Create a cache holding at most `capacity` results (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached result for these inputs or run the pipeline.
    pub fn get_or_compute(
        &mut self,
        data: &SalesData,
        options: &PipelineOptions,
    ) -> Result<CachedRun> {
        let key = fingerprint(data, options)?;

        if let Some((_, aggregates)) = self.entries.iter().find(|(k, _)| *k == key) {
            self.hits += 1;
            debug!("Pipeline cache hit for {}", &key[..12]);
            return Ok(CachedRun {
                fingerprint: key,
                aggregates: Arc::clone(aggregates),
                hit: true,
            });
        }

        self.misses += 1;
        debug!("Pipeline cache miss for {}", &key[..12]);

        let aggregates = Arc::new(run_pipeline(data, options)?);

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key.clone(), Arc::clone(&aggregates)));

        Ok(CachedRun {
            fingerprint: key,
            aggregates,
            hit: false,
        })
    }

    /// Drop every cached result.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderItem, Product, Store};

    fn data(quantity: i64) -> SalesData {
        SalesData {
            orders: vec![Order {
                order_id: "1".to_string(),
                store_id: "S1".to_string(),
                order_date: "2017-01-01".to_string(),
            }],
            order_items: vec![OrderItem {
                order_id: "1".to_string(),
                product_id: "P1".to_string(),
                quantity,
                list_price: 10.0,
                discount: 0.1,
            }],
            stores: vec![Store {
                store_id: "S1".to_string(),
                state: "CA".to_string(),
            }],
            products: vec![Product {
                product_id: "P1".to_string(),
                product_name: "Widget".to_string(),
            }],
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let options = PipelineOptions::default();
        let a = fingerprint(&data(2), &options).unwrap();
        let b = fingerprint(&data(2), &options).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let options = PipelineOptions::default();
        let base = fingerprint(&data(2), &options).unwrap();

        assert_ne!(base, fingerprint(&data(3), &options).unwrap());

        let other_options = PipelineOptions {
            top_products_limit: 5,
            ..PipelineOptions::default()
        };
        assert_ne!(base, fingerprint(&data(2), &other_options).unwrap());
    }

    #[test]
    fn test_cache_hit_and_miss() {
        let mut cache = PipelineCache::default();
        let options = PipelineOptions::default();

        let first = cache.get_or_compute(&data(2), &options).unwrap();
        assert!(!first.hit);

        let second = cache.get_or_compute(&data(2), &options).unwrap();
        assert!(second.hit);
        assert!(Arc::ptr_eq(&first.aggregates, &second.aggregates));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_changed_inputs_recompute_and_evict() {
        let mut cache = PipelineCache::new(1);
        let options = PipelineOptions::default();

        let first = cache.get_or_compute(&data(2), &options).unwrap();
        let changed = cache.get_or_compute(&data(4), &options).unwrap();

        assert!(!changed.hit);
        assert_ne!(first.fingerprint, changed.fingerprint);
        assert!((changed.aggregates.total_revenue - 36.0).abs() < 1e-9);
        assert_eq!(cache.len(), 1);

        let again = cache.get_or_compute(&data(2), &options).unwrap();
        assert!(!again.hit);
    }

    #[test]
    fn test_invalidate_clears_entries() {
        let mut cache = PipelineCache::new(4);
        let options = PipelineOptions::default();

        assert!(cache.is_empty());
        cache.get_or_compute(&data(2), &options).unwrap();
        assert!(!cache.is_empty());
        cache.invalidate();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());

        let rerun = cache.get_or_compute(&data(2), &options).unwrap();
        assert!(!rerun.hit);
    }

    #[test]
    fn test_pipeline_errors_are_not_cached() {
        let mut cache = PipelineCache::default();
        let options = PipelineOptions::default();

        assert!(cache.get_or_compute(&data(-1), &options).is_err());
        assert_eq!(cache.len(), 0);
    }
}
