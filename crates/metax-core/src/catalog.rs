//! # Catalog Interface
//!
//! The catalog supplies base-table metadata: column definitions and table-level
//! statistics. Scan-level metadata answers bottom out here; everything above a
//! scan is derived by handlers.
//!
//! The `Catalog` trait is minimal and used behind `dyn Catalog` so different
//! backends can serve metadata. `InMemoryCatalog` is the programmatically
//! populated implementation used in tests and development.

use crate::expr::{ColumnRef, TableRef};
use crate::stats::Statistics;
use std::collections::HashMap;

/// Catalog provides schema and statistics information.
pub trait Catalog: Send + Sync {
    fn table_stats(&self, table: &TableRef) -> Option<Statistics>;
    fn table_columns(&self, table: &TableRef) -> Option<Vec<ColumnRef>>;
}

/// In-memory catalog for testing and development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    table_stats: HashMap<TableRef, Statistics>,
    table_columns: HashMap<TableRef, Vec<ColumnRef>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: &TableRef, columns: Vec<ColumnRef>, stats: Statistics) {
        self.table_columns.insert(table.clone(), columns);
        self.table_stats.insert(table.clone(), stats);
    }
}

impl Catalog for InMemoryCatalog {
    fn table_stats(&self, table: &TableRef) -> Option<Statistics> {
        self.table_stats.get(table).cloned()
    }

    fn table_columns(&self, table: &TableRef) -> Option<Vec<ColumnRef>> {
        self.table_columns.get(table).cloned()
    }
}
