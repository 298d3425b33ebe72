//! Error taxonomy for loading and aggregation.

use crate::models::Table;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading input tables or running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing {table} table: {} not found", path.display())]
    MissingFile { table: Table, path: PathBuf },

    #[error("invalid input in {table} ({location}): {reason}")]
    InvalidInput {
        table: Table,
        location: String,
        reason: String,
    },

    #[error("failed to read {table} table from {}: {source}", path.display())]
    Io {
        table: Table,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn invalid(table: Table, location: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidInput {
            table,
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// A dangling foreign key. The referencing row is dropped from the join
/// and this warning is recorded instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityWarning {
    /// Table holding the dangling reference.
    pub table: Table,
    /// Column holding the dangling reference.
    pub column: String,
    /// The key value with no match.
    pub value: String,
    /// Table the key should have matched.
    pub referenced: Table,
    /// Line revenue carried by the dropped row.
    pub dropped_revenue: f64,
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} '{}' has no matching {} row; dropped {:.2} of revenue",
            self.table, self.column, self.value, self.referenced, self.dropped_revenue
        )
    }
}
