//! Analysis modules.
//!
//! The aggregation pipeline, the region/product filters applied to its
//! output, and the cache that memoizes whole pipeline runs.

pub mod aggregator;
pub mod cache;
pub mod filters;

pub use aggregator::*;
pub use cache::PipelineCache;
pub use filters::{filter_by_product, filter_by_region};
