//! # Statistics
//!
//! Table- and column-level statistics consumed by the built-in metadata handlers.
//! Accurate statistics are what make cardinality and selectivity answers useful:
//! row counts drive join ordering decisions, and column NDVs (number of distinct
//! values) drive equality selectivity.
//!
//! ## Selectivity Constants
//!
//! - **Equality**: 1 / NDV (uniform distribution assumption).
//! - **Range**: fixed 1/3 heuristic.
//! - **Default**: 0.1 (10%) when no better estimate is available.
//!
//! The derivation formulas themselves (filter scaling, the equi-join NDV
//! formula, group-by NDV products) live in the handler implementations; this
//! module only holds the data they read.

use crate::expr::ScalarValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Statistics for a relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub row_count: f64,
    pub total_size_bytes: f64,
    pub column_stats: HashMap<String, ColumnStatistics>,
}

impl Statistics {
    pub fn new(row_count: f64, total_size_bytes: f64) -> Self {
        Self {
            row_count,
            total_size_bytes,
            column_stats: HashMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, stats: ColumnStatistics) -> Self {
        self.column_stats.insert(name.into(), stats);
        self
    }
}

/// Per-column statistics used for selectivity estimation.
///
/// These are typically gathered by ANALYZE TABLE and served through the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Number of distinct values (NDV). Used for equality selectivity: sel = 1/NDV.
    pub distinct_count: f64,
    /// Fraction of rows that are NULL [0.0, 1.0]. Used for IS NULL selectivity.
    pub null_fraction: f64,
    /// Minimum value in the column (if known).
    pub min_value: Option<ScalarValue>,
    /// Maximum value in the column (if known).
    pub max_value: Option<ScalarValue>,
    /// Average size of a single value in bytes.
    pub avg_row_size: f64,
}

impl ColumnStatistics {
    pub fn new(distinct_count: f64, null_fraction: f64) -> Self {
        Self {
            distinct_count,
            null_fraction,
            min_value: None,
            max_value: None,
            avg_row_size: 8.0,
        }
    }
}

/// Default filter selectivity when we can't determine it.
pub const DEFAULT_FILTER_SELECTIVITY: f64 = 0.1;

/// Selectivity heuristic for range predicates (`<`, `<=`, `>`, `>=`).
pub const DEFAULT_RANGE_SELECTIVITY: f64 = 1.0 / 3.0;

/// Row count assumed for a table the catalog knows nothing about.
pub const DEFAULT_ROW_COUNT: f64 = 1000.0;
